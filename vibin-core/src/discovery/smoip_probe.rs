//! Probes a Cambridge Audio StreamMagic device's `/smoip/system/upnp`
//! endpoint, which lists every UPnP device the unit (or its ecosystem)
//! exposes. Used both to confirm a bare hostname is a StreamMagic device
//! and to ask a streamer which media server it is paired with.

use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SmoipProbeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response was not a recognizable smoip device listing")]
    UnexpectedShape,
    #[error("no device manufactured by '{0}' was listed")]
    NoMatchingDevice(String),
}

#[derive(Debug, Deserialize)]
struct SmoipUpnpResponse {
    data: SmoipUpnpData,
}

#[derive(Debug, Deserialize)]
struct SmoipUpnpData {
    devices: Vec<SmoipUpnpDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmoipUpnpDevice {
    pub manufacturer: String,
    pub description_url: String,
}

/// Lists every UPnP device `host` reports via its smoip endpoint.
pub async fn list_smoip_devices(client: &Client, host: &str) -> Result<Vec<SmoipUpnpDevice>, SmoipProbeError> {
    let url = format!("http://{host}/smoip/system/upnp");
    let response = client.get(&url).timeout(std::time::Duration::from_secs(10)).send().await?;

    if !response.status().is_success() {
        return Err(SmoipProbeError::UnexpectedShape);
    }

    let parsed: SmoipUpnpResponse = response.json().await.map_err(|_| SmoipProbeError::UnexpectedShape)?;
    Ok(parsed.data.devices)
}

/// Probes `host` and returns the `description_url` of the first listed
/// device manufactured by `manufacturer`.
pub async fn probe_smoip_device(client: &Client, host: &str, manufacturer: &str) -> Result<String, SmoipProbeError> {
    let devices = list_smoip_devices(client, host).await?;
    devices
        .into_iter()
        .find(|device| device.manufacturer == manufacturer)
        .map(|device| device.description_url)
        .ok_or_else(|| SmoipProbeError::NoMatchingDevice(manufacturer.to_string()))
}
