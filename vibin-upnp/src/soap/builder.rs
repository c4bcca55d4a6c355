use xmltree::{Element, EmitterConfig, XMLNode};

/// Builds a SOAP 1.1 request envelope invoking `action` on `service_type`
/// with the given ordered argument list.
pub fn build_action_request(service_type: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut action_elem = Element::new(action);
    action_elem.namespace = Some(service_type.to_string());
    action_elem
        .attributes
        .insert("xmlns:u".to_string(), service_type.to_string());

    for (name, value) in args {
        let mut child = Element::new(name);
        if !value.is_empty() {
            child.children.push(XMLNode::Text(value.to_string()));
        }
        action_elem.children.push(XMLNode::Element(child));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(action_elem));

    let mut envelope = Element::new("s:Envelope");
    envelope.attributes.insert(
        "xmlns:s".to_string(),
        "http://schemas.xmlsoap.org/soap/envelope/".to_string(),
    );
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        "http://schemas.xmlsoap.org/soap/encoding/".to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new().perform_indent(false);
    envelope
        .write_with_config(&mut buf, config)
        .expect("writing to an in-memory buffer cannot fail");

    String::from_utf8(buf).expect("xmltree only emits valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_action_and_arguments() {
        let xml = build_action_request(
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            "Browse",
            &[("ObjectID", "0"), ("BrowseFlag", "BrowseDirectChildren")],
        );

        assert!(xml.contains("Browse"));
        assert!(xml.contains("<ObjectID>0</ObjectID>"));
        assert!(xml.contains("BrowseDirectChildren"));
    }
}
