//! Maps a resolved [`DeviceDescription`] to the adapter variant that should
//! drive it, per spec.md §4.1: look the model name up in a static table
//! first; failing that, fall back to matching against each adapter's own
//! declared `modelName` substring.

use vibin_upnp::DeviceDescription;

use crate::errors::{Result, VibinError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerAdapterKind {
    CambridgeStreamMagic,
}

impl StreamerAdapterKind {
    /// Substring this adapter expects to see in an unrecognized device's
    /// `modelName`, used as the fallback match.
    fn declared_model_name(&self) -> &'static str {
        match self {
            StreamerAdapterKind::CambridgeStreamMagic => "StreamMagic",
        }
    }
}

const STREAMER_MODEL_MAP: &[(&str, StreamerAdapterKind)] = &[
    ("StreamMagic 6", StreamerAdapterKind::CambridgeStreamMagic),
    ("CXNv2", StreamerAdapterKind::CambridgeStreamMagic),
    ("EVO 75", StreamerAdapterKind::CambridgeStreamMagic),
    ("EVO 150", StreamerAdapterKind::CambridgeStreamMagic),
];

/// Classifies a streamer device description to the adapter that should own
/// it. Only the Cambridge Audio StreamMagic dialect is implemented; other
/// manufacturers fail classification rather than being silently treated as
/// StreamMagic.
pub fn classify_streamer(desc: &DeviceDescription) -> Result<StreamerAdapterKind> {
    if let Some((_, kind)) = STREAMER_MODEL_MAP.iter().find(|(model, _)| *model == desc.model_name) {
        return Ok(*kind);
    }

    if desc.manufacturer == "Cambridge Audio"
        || desc
            .model_name
            .to_ascii_lowercase()
            .contains(&StreamerAdapterKind::CambridgeStreamMagic.declared_model_name().to_ascii_lowercase())
    {
        return Ok(StreamerAdapterKind::CambridgeStreamMagic);
    }

    Err(VibinError::DeviceError(format!(
        "no streamer adapter for manufacturer '{}' model '{}'",
        desc.manufacturer, desc.model_name
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaServerAdapterKind {
    /// Generic UPnP ContentDirectory browsing, as exposed by e.g. Asset UPnP.
    UpnpContentDirectory,
}

/// Classifies a media server device description. Any device exposing a
/// ContentDirectory service can be driven by the generic adapter; the model
/// name is only used for logging.
pub fn classify_media_server(desc: &DeviceDescription) -> Result<MediaServerAdapterKind> {
    if desc.service("ContentDirectory").is_some() {
        Ok(MediaServerAdapterKind::UpnpContentDirectory)
    } else {
        Err(VibinError::MediaServerError(format!(
            "device '{}' does not expose a ContentDirectory service",
            desc.friendly_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(manufacturer: &str, model_name: &str) -> DeviceDescription {
        DeviceDescription {
            location: "http://192.168.1.50/desc.xml".to_string(),
            udn: "uuid:abc".to_string(),
            device_type: "urn:schemas-upnp-org:device:MediaRenderer:1".to_string(),
            friendly_name: "Living Room".to_string(),
            manufacturer: manufacturer.to_string(),
            model_name: model_name.to_string(),
            services: Vec::new(),
        }
    }

    #[test]
    fn classifies_known_model_via_static_map() {
        let kind = classify_streamer(&desc("Cambridge Audio", "StreamMagic 6")).unwrap();
        assert_eq!(kind, StreamerAdapterKind::CambridgeStreamMagic);
    }

    #[test]
    fn falls_back_to_manufacturer_match_for_unknown_model() {
        let kind = classify_streamer(&desc("Cambridge Audio", "Some Future Model")).unwrap();
        assert_eq!(kind, StreamerAdapterKind::CambridgeStreamMagic);
    }

    #[test]
    fn rejects_unsupported_manufacturer() {
        assert!(classify_streamer(&desc("Sonos", "Era 300")).is_err());
    }

    #[test]
    fn media_server_requires_content_directory() {
        let mut d = desc("Sonic Orbiter", "Asset UPnP");
        d.services.push(vibin_upnp::ServiceDescription {
            service_type: "urn:schemas-upnp-org:service:ContentDirectory:1".to_string(),
            control_url: "/ctrl/cd".to_string(),
            event_sub_url: "/evt/cd".to_string(),
        });
        assert!(classify_media_server(&d).is_ok());

        let without = desc("Sonic Orbiter", "Asset UPnP");
        assert!(classify_media_server(&without).is_err());
    }
}
