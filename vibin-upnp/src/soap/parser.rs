use xmltree::Element;

use super::SoapEnvelope;

#[derive(Debug, Clone)]
pub struct SoapFault {
    pub code: Option<u32>,
    pub description: String,
}

/// Parses a raw SOAP response body into an envelope, or a [`SoapFault`] if
/// the device returned `<s:Fault>`.
pub fn parse_envelope(xml: &[u8]) -> Result<Result<SoapEnvelope, SoapFault>, xmltree::ParseError> {
    let root = Element::parse(xml)?;

    let body = root
        .children
        .iter()
        .find_map(|n| n.as_element())
        .filter(|e| e.name == "Body" || e.name.ends_with(":Body"))
        .cloned()
        .unwrap_or_else(|| Element::new("Body"));

    if let Some(fault) = body
        .children
        .iter()
        .find_map(|n| n.as_element())
        .filter(|e| e.name == "Fault" || e.name.ends_with(":Fault"))
    {
        return Ok(Err(parse_fault(fault)));
    }

    Ok(Ok(SoapEnvelope { body }))
}

fn parse_fault(fault: &Element) -> SoapFault {
    let description = fault
        .get_child("faultstring")
        .and_then(|e| e.get_text())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "SOAP fault".to_string());

    let code = fault
        .get_child("detail")
        .and_then(|detail| {
            detail
                .children
                .iter()
                .find_map(|n| n.as_element())
                .filter(|e| e.name.ends_with("UPnPError"))
        })
        .and_then(|upnp_error| upnp_error.get_child("errorCode"))
        .and_then(|e| e.get_text())
        .and_then(|s| s.trim().parse().ok());

    SoapFault { code, description }
}

/// Pulls the named argument values out of an action response body. Returns
/// `None` for arguments the body didn't contain (the caller decides whether
/// that's a [`super::SoapError::MissingArgument`]).
pub fn extract_action_values(envelope: &SoapEnvelope, names: &[&str]) -> Vec<Option<String>> {
    let Some(response_elem) = envelope.body.children.iter().find_map(|n| n.as_element()) else {
        return vec![None; names.len()];
    };

    names
        .iter()
        .map(|name| {
            response_elem
                .get_child(*name)
                .and_then(|e| e.get_text())
                .map(|s| s.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT_XML: &str = r#"<?xml version="1.0"?>
        <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
          <s:Body>
            <s:Fault>
              <faultcode>s:Client</faultcode>
              <faultstring>UPnPError</faultstring>
              <detail>
                <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                  <errorCode>402</errorCode>
                  <errorDescription>Invalid Args</errorDescription>
                </UPnPError>
              </detail>
            </s:Fault>
          </s:Body>
        </s:Envelope>"#;

    #[test]
    fn parses_fault_with_error_code() {
        let result = parse_envelope(FAULT_XML.as_bytes()).unwrap();
        let fault = result.unwrap_err();
        assert_eq!(fault.code, Some(402));
    }

    const RESPONSE_XML: &str = r#"<?xml version="1.0"?>
        <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
          <s:Body>
            <u:GetPositionInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
              <Track>3</Track>
              <RelTime>00:01:30</RelTime>
            </u:GetPositionInfoResponse>
          </s:Body>
        </s:Envelope>"#;

    #[test]
    fn extracts_response_arguments() {
        let envelope = parse_envelope(RESPONSE_XML.as_bytes()).unwrap().unwrap();
        let values = extract_action_values(&envelope, &["Track", "RelTime", "Missing"]);
        assert_eq!(values[0].as_deref(), Some("3"));
        assert_eq!(values[1].as_deref(), Some("00:01:30"));
        assert_eq!(values[2], None);
    }
}
