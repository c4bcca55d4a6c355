use reqwest::Client;

use super::builder::build_action_request;
use super::envelope::SoapEnvelope;
use super::parser::parse_envelope;
use super::SoapError;

/// Result of a SOAP call: HTTP status, the raw XML body (always kept around
/// for logging/debugging), and the parsed envelope if parsing succeeded.
pub struct SoapCallResult {
    pub status: reqwest::StatusCode,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

/// Invokes a UPnP SOAP action on a control URL and returns the raw result.
/// Non-2xx HTTP responses are not treated as transport errors here — the
/// caller inspects `status` and `envelope` to decide how to react, since a
/// SOAP fault is carried in a 500 response body rather than a transport
/// failure.
pub async fn invoke_action(
    client: &Client,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<SoapCallResult, SoapError> {
    let body = build_action_request(service_type, action, args);
    let soap_action = format!("\"{service_type}#{action}\"");

    let response = client
        .post(control_url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", soap_action)
        .body(body)
        .send()
        .await
        .map_err(|source| SoapError::Http {
            url: control_url.to_string(),
            action: action.to_string(),
            source,
        })?;

    let status = response.status();
    let raw_body = response.text().await.map_err(|source| SoapError::Http {
        url: control_url.to_string(),
        action: action.to_string(),
        source,
    })?;

    let envelope = match parse_envelope(raw_body.as_bytes()) {
        Ok(Ok(envelope)) => Some(envelope),
        Ok(Err(fault)) => {
            return Err(SoapError::Fault {
                action: action.to_string(),
                code: fault.code,
                message: fault.description,
            });
        }
        Err(_) => None,
    };

    Ok(SoapCallResult {
        status,
        raw_body,
        envelope,
    })
}

/// Invokes an action and extracts the named response arguments, failing if
/// any of them is absent from the response body.
pub async fn invoke_action_expecting(
    client: &Client,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
    expected: &[&str],
) -> Result<Vec<String>, SoapError> {
    let result = invoke_action(client, control_url, service_type, action, args).await?;

    let envelope = result.envelope.ok_or_else(|| SoapError::EmptyResponse {
        url: control_url.to_string(),
        action: action.to_string(),
    })?;

    super::parser::extract_action_values(&envelope, expected)
        .into_iter()
        .zip(expected.iter())
        .map(|(value, name)| value.ok_or_else(|| SoapError::MissingArgument(name.to_string())))
        .collect()
}
