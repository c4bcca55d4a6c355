//! SOAP envelope parsing/building and client-side action invocation for
//! UPnP control. Devices speak a minimal, strict subset of SOAP 1.1, so this
//! is a hand-rolled envelope shape rather than a general SOAP library.

mod builder;
mod client;
mod envelope;
mod parser;

pub use builder::build_action_request;
pub use client::{SoapCallResult, invoke_action, invoke_action_expecting};
pub use envelope::SoapEnvelope;
pub use parser::{SoapFault, extract_action_values, parse_envelope};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoapError {
    #[error("HTTP error calling {action} on {url}: {source}")]
    Http {
        url: String,
        action: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed SOAP envelope from {url}: {source}")]
    Xml {
        url: String,
        #[source]
        source: xmltree::ParseError,
    },
    #[error("device rejected action {action}: UPnP error {code:?}: {message}")]
    Fault {
        action: String,
        code: Option<u32>,
        message: String,
    },
    #[error("missing expected argument {0} in SOAP response")]
    MissingArgument(String),
    #[error("response from {url} to action {action} was not a parseable SOAP envelope")]
    EmptyResponse { url: String, action: String },
}

/// Standard UPnP SOAP fault error codes (spec.md §4.2's `SoapError`
/// carries one of these when available).
pub mod error_codes {
    pub const INVALID_ACTION: u32 = 401;
    pub const INVALID_ARGS: u32 = 402;
    pub const ACTION_FAILED: u32 = 501;
    pub const ARGUMENT_VALUE_INVALID: u32 = 600;
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u32 = 601;
    pub const PRECONDITION_FAILED: u32 = 412;
}
