//! UPnP device description (`description.xml`) fetch and parse. Used by
//! discovery to turn an SSDP location or a direct URL into a structured
//! device: its identity fields plus the service list needed to build SOAP
//! control URLs and GENA event-subscription URLs.

use reqwest::{Client, Url};
use xmltree::Element;

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("HTTP error fetching device description at {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed device description XML at {url}: {source}")]
    Xml {
        url: String,
        #[source]
        source: xmltree::ParseError,
    },
    #[error("device description at {url} is missing required element <{field}>")]
    MissingField { url: String, field: &'static str },
}

#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub service_type: String,
    pub control_url: String,
    pub event_sub_url: String,
}

#[derive(Debug, Clone)]
pub struct DeviceDescription {
    pub location: String,
    pub udn: String,
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub services: Vec<ServiceDescription>,
}

impl DeviceDescription {
    /// Finds the first service whose `serviceType` contains `needle`
    /// (case-insensitive), e.g. `"ContentDirectory"`.
    pub fn service(&self, needle: &str) -> Option<&ServiceDescription> {
        let needle = needle.to_ascii_lowercase();
        self.services
            .iter()
            .find(|s| s.service_type.to_ascii_lowercase().contains(&needle))
    }

    /// Resolves a control/event-sub URL (often relative) against this
    /// device's description-document location.
    pub fn resolve_url(&self, relative: &str) -> String {
        match Url::parse(&self.location).and_then(|base| base.join(relative)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => relative.to_string(),
        }
    }
}

/// Fetches and parses the device description document at `location`.
pub async fn fetch_description(client: &Client, location: &str) -> Result<DeviceDescription, DescriptionError> {
    let body = client
        .get(location)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|source| DescriptionError::Http {
            url: location.to_string(),
            source,
        })?
        .bytes()
        .await
        .map_err(|source| DescriptionError::Http {
            url: location.to_string(),
            source,
        })?;

    let root = Element::parse(body.as_ref()).map_err(|source| DescriptionError::Xml {
        url: location.to_string(),
        source,
    })?;

    let device = root.get_child("device").ok_or_else(|| DescriptionError::MissingField {
        url: location.to_string(),
        field: "device",
    })?;

    let device_type = required_text(device, "deviceType", location)?;
    let friendly_name = required_text(device, "friendlyName", location)?;
    let manufacturer = optional_text(device, "manufacturer").unwrap_or_default();
    let model_name = optional_text(device, "modelName").unwrap_or_default();
    let udn = optional_text(device, "UDN").unwrap_or_default();

    let mut services = Vec::new();
    if let Some(service_list) = device.get_child("serviceList") {
        for service in service_list
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .filter(|e| e.name == "service")
        {
            if let (Some(service_type), Some(control_url), Some(event_sub_url)) = (
                optional_text(service, "serviceType"),
                optional_text(service, "controlURL"),
                optional_text(service, "eventSubURL"),
            ) {
                services.push(ServiceDescription {
                    service_type,
                    control_url,
                    event_sub_url,
                });
            }
        }
    }

    Ok(DeviceDescription {
        location: location.to_string(),
        udn,
        device_type,
        friendly_name,
        manufacturer,
        model_name,
        services,
    })
}

fn optional_text(element: &Element, child: &str) -> Option<String> {
    element.get_child(child).and_then(|c| c.get_text()).map(|s| s.trim().to_string())
}

fn required_text(element: &Element, child: &str, location: &str) -> Result<String, DescriptionError> {
    optional_text(element, child).ok_or_else(|| DescriptionError::MissingField {
        url: location.to_string(),
        field: Box::leak(child.to_string().into_boxed_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>Living Room</friendlyName>
    <manufacturer>Cambridge Audio</manufacturer>
    <modelName>StreamMagic 6</modelName>
    <UDN>uuid:abc-123</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:AVTransport:1</serviceType>
        <controlURL>/ctrl/AVTransport</controlURL>
        <eventSubURL>/evt/AVTransport</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#;

    #[test]
    fn parses_identity_fields_and_services() {
        let root = Element::parse(SAMPLE.as_bytes()).unwrap();
        let device = root.get_child("device").unwrap();
        assert_eq!(optional_text(device, "friendlyName").unwrap(), "Living Room");
        assert_eq!(optional_text(device, "manufacturer").unwrap(), "Cambridge Audio");

        let service_list = device.get_child("serviceList").unwrap();
        let service = service_list
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .find(|e| e.name == "service")
            .unwrap();
        assert_eq!(
            optional_text(service, "serviceType").unwrap(),
            "urn:schemas-upnp-org:service:AVTransport:1"
        );
    }

    #[test]
    fn resolve_url_joins_relative_paths() {
        let desc = DeviceDescription {
            location: "http://192.168.1.50:80/desc.xml".to_string(),
            udn: "uuid:abc".to_string(),
            device_type: "urn:schemas-upnp-org:device:MediaRenderer:1".to_string(),
            friendly_name: "Living Room".to_string(),
            manufacturer: "Cambridge Audio".to_string(),
            model_name: "StreamMagic 6".to_string(),
            services: Vec::new(),
        };
        assert_eq!(desc.resolve_url("/ctrl/AVTransport"), "http://192.168.1.50/ctrl/AVTransport");
    }
}
