//! Parses a GENA `NOTIFY` request body: an `<e:propertyset>` whose
//! `<e:property>` children each wrap exactly one element named after the
//! changed state variable. Grounded on `soap::parser`'s `xmltree`-based
//! parsing idiom.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use xmltree::Element;

#[derive(Debug, Error)]
pub enum GenaError {
    #[error("failed to parse GENA NOTIFY body: {0}")]
    Parse(#[from] xmltree::ParseError),
}

/// Each `<e:property>` wraps one `<VarName>value</VarName>` element; the
/// returned map is keyed by that variable name. Values that look like JSON
/// (UPnP services increasingly encode structured state as a JSON string,
/// e.g. Cambridge Audio's `LastChange`) are parsed as such; everything else
/// is kept as a plain string.
pub fn parse_gena_property_set(body: &[u8]) -> Result<HashMap<String, Value>, GenaError> {
    let root = Element::parse(body)?;
    let mut values = HashMap::new();

    for property in root.children.iter().filter_map(|n| n.as_element()).filter(|e| e.name == "property" || e.name.ends_with(":property")) {
        for variable in property.children.iter().filter_map(|n| n.as_element()) {
            let text = variable.get_text().map(|s| s.to_string()).unwrap_or_default();
            let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
            values.insert(variable.name.clone(), value);
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_string_properties() {
        let xml = r#"<?xml version="1.0"?>
            <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
              <e:property><TransportState>PLAYING</TransportState></e:property>
              <e:property><CurrentTrack>3</CurrentTrack></e:property>
            </e:propertyset>"#;

        let values = parse_gena_property_set(xml.as_bytes()).unwrap();
        assert_eq!(values.get("TransportState"), Some(&Value::String("PLAYING".to_string())));
        assert_eq!(values.get("CurrentTrack"), Some(&Value::Number(3.into())));
    }

    #[test]
    fn parses_embedded_json_payloads() {
        let xml = r#"<?xml version="1.0"?>
            <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
              <e:property><LastChange>{"power":"on"}</LastChange></e:property>
            </e:propertyset>"#;

        let values = parse_gena_property_set(xml.as_bytes()).unwrap();
        assert_eq!(values.get("LastChange").unwrap().get("power").unwrap(), "on");
    }
}
