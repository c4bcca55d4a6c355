//! Device discovery and adapter classification.
//!
//! Resolves a user-supplied specifier (empty / URL / hostname / UPnP
//! friendly name) for the streamer and, optionally, the media server, into a
//! [`vibin_upnp::DeviceDescription`] plus the adapter variant that should
//! drive it. Grounded on `vibin/device_resolution.py`'s resolution order and
//! on the SSDP plumbing in `pmocontrol/src/discovery/upnp_discovery.rs`
//! (UDN extraction, SSDP event dispatch), though this module resolves a
//! single device per call rather than running a continuous registry.

mod classify;
mod smoip_probe;

pub use classify::{MediaServerAdapterKind, StreamerAdapterKind, classify_media_server, classify_streamer};

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};
use vibin_upnp::{DeviceDescription, SsdpClient, SsdpEvent, fetch_description};

use crate::errors::{Result, VibinError};

const CAMBRIDGE_AUDIO: &str = "Cambridge Audio";
const MEDIA_RENDERER: &str = "MediaRenderer";
const MEDIA_SERVER: &str = "MediaServer";

/// Resolves the streamer per spec.md §4.1: empty input drives an SSDP
/// search for a Cambridge Audio MediaRenderer; a URL is loaded directly;
/// anything else is probed as a StreamMagic hostname, falling back to an
/// SSDP search by UPnP friendly name.
pub async fn resolve_streamer(
    client: &Client,
    streamer_input: Option<&str>,
    discovery_timeout: Duration,
) -> Result<DeviceDescription> {
    match streamer_input.filter(|s| !s.is_empty()) {
        None => {
            info!("no streamer specified, searching for a Cambridge Audio MediaRenderer");
            let candidates = ssdp_search(MEDIA_RENDERER, discovery_timeout).await?;
            first_matching(client, candidates, |desc| desc.manufacturer == CAMBRIDGE_AUDIO && desc.device_type.contains(MEDIA_RENDERER))
                .await?
                .ok_or_else(|| VibinError::NotFound("no Cambridge Audio MediaRenderer found on the network".into()))
        }
        Some(input) => {
            if let Some(location) = as_location_url(input) {
                info!(%location, "loading streamer from provided UPnP location URL");
                fetch_description(client, &location)
                    .await
                    .map_err(|err| VibinError::DeviceError(format!("could not load UPnP device at {location}: {err}")))
            } else {
                info!(host = input, "probing for a StreamMagic device at provided hostname");
                match smoip_probe::probe_smoip_device(client, input, CAMBRIDGE_AUDIO).await {
                    Ok(location) => fetch_description(client, &location)
                        .await
                        .map_err(|err| VibinError::DeviceError(format!("Cambridge Audio device found at {input} but its description was unreachable: {err}"))),
                    Err(probe_err) => {
                        warn!(host = input, %probe_err, "smoip probe failed, falling back to SSDP by friendly name");
                        let candidates = ssdp_search(MEDIA_RENDERER, discovery_timeout).await?;
                        first_matching(client, candidates, |desc| desc.friendly_name == input)
                            .await?
                            .ok_or_else(|| VibinError::NotFound(format!("no UPnP device with friendly name '{input}'")))
                    }
                }
            }
        }
    }
}

/// Resolves the media server per spec.md §4.1. `media_server_input` follows
/// the CLI convention: `None` means "not specified, discover it"; `Some("")`
/// (an explicitly empty string) is treated the same as unspecified.
/// Absence is not an error: callers get `Ok(None)` and features that need a
/// media server degrade accordingly.
pub async fn resolve_media_server(
    client: &Client,
    media_server_input: Option<&str>,
    discovery_timeout: Duration,
    streamer: &DeviceDescription,
) -> Result<Option<DeviceDescription>> {
    match media_server_input.filter(|s| !s.is_empty()) {
        None => {
            if streamer.manufacturer == CAMBRIDGE_AUDIO {
                info!(streamer = %streamer.friendly_name, "asking the streamer which media server it is using");
                resolve_media_server_via_streamer(client, streamer).await
            } else {
                info!("no media server specified, searching by device type");
                let candidates = ssdp_search(MEDIA_SERVER, discovery_timeout).await?;
                Ok(first_matching(client, candidates, |desc| desc.device_type.contains(MEDIA_SERVER)).await?)
            }
        }
        Some(input) => {
            if let Some(location) = as_location_url(input) {
                info!(%location, "loading media server from provided UPnP location URL");
                fetch_description(client, &location)
                    .await
                    .map(Some)
                    .map_err(|err| VibinError::DeviceError(format!("could not load UPnP device at {location}: {err}")))
            } else {
                info!(name = input, "searching for media server by UPnP friendly name");
                let candidates = ssdp_search(MEDIA_SERVER, discovery_timeout).await?;
                first_matching(client, candidates, |desc| desc.friendly_name == input)
                    .await?
                    .ok_or_else(|| VibinError::NotFound(format!("no UPnP device with friendly name '{input}'")))
                    .map(Some)
            }
        }
    }
}

/// Asks a Cambridge Audio streamer, via its `/smoip/system/upnp` listing,
/// which MediaServer device it is bound to. Returns `Ok(None)` if the
/// streamer reports no media server (this is not an error, just an absent
/// feature), and an error only if the streamer itself could not be queried.
async fn resolve_media_server_via_streamer(client: &Client, streamer: &DeviceDescription) -> Result<Option<DeviceDescription>> {
    let host = streamer_host(streamer)?;
    let devices = smoip_probe::list_smoip_devices(client, &host)
        .await
        .map_err(|err| VibinError::DeviceError(format!("could not determine media server from Cambridge Audio device: {err}")))?;

    for candidate in devices {
        match fetch_description(client, &candidate.description_url).await {
            Ok(desc) if desc.device_type.contains(MEDIA_SERVER) => return Ok(Some(desc)),
            Ok(_) => continue,
            Err(_) => continue,
        }
    }

    warn!(streamer = %streamer.friendly_name, "Cambridge Audio streamer did not report a media server");
    Ok(None)
}

fn streamer_host(streamer: &DeviceDescription) -> Result<String> {
    reqwest::Url::parse(&streamer.location)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_string()))
        .ok_or_else(|| VibinError::DeviceError(format!("streamer location is not a valid URL: {}", streamer.location)))
}

/// A non-empty string that parses as a URL with a host is treated as a
/// direct UPnP description-document location; anything else (a bare
/// hostname or a UPnP friendly name) is not.
fn as_location_url(input: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(input).ok()?;
    parsed.host_str()?;
    Some(input.to_string())
}

async fn ssdp_search(search_target_hint: &str, timeout: Duration) -> Result<Vec<SsdpEvent>> {
    let search_target = format!("urn:schemas-upnp-org:device:{search_target_hint}:1");
    tokio::task::spawn_blocking(move || -> Result<Vec<SsdpEvent>> {
        let ssdp = SsdpClient::new().map_err(|err| VibinError::DeviceError(format!("could not open SSDP socket: {err}")))?;
        ssdp.search(&search_target, timeout)
            .map_err(|err| VibinError::DeviceError(format!("SSDP search failed: {err}")))
    })
    .await
    .map_err(|err| VibinError::Internal(format!("SSDP search task panicked: {err}")))?
}

/// Fetches each candidate's device description and returns the first one
/// for which `predicate` holds. Descriptions that fail to fetch are skipped
/// rather than treated as a hard error, since SSDP responses can include
/// unrelated devices.
async fn first_matching<F>(client: &Client, events: Vec<SsdpEvent>, predicate: F) -> Result<Option<DeviceDescription>>
where
    F: Fn(&DeviceDescription) -> bool,
{
    for event in events {
        let Some(location) = event.location() else { continue };
        match fetch_description(client, location).await {
            Ok(desc) if predicate(&desc) => return Ok(Some(desc)),
            Ok(_) => continue,
            Err(err) => {
                warn!(%location, %err, "skipping SSDP candidate: could not load its description");
                continue;
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_url_requires_a_host() {
        assert_eq!(as_location_url("http://192.168.1.50:80/desc.xml").as_deref(), Some("http://192.168.1.50:80/desc.xml"));
        assert_eq!(as_location_url("streamer.local"), None);
        assert_eq!(as_location_url("Living Room Streamer"), None);
    }
}
