use thiserror::Error;

/// The abstract error kinds the core can raise. The REST layer (outside this
/// crate) maps these to HTTP status codes: `NotFound` → 404, `InputError` →
/// 400, `DeviceError` → 503, `MissingDependencyError` → 404, everything else
/// → 500.
#[derive(Debug, Error)]
pub enum VibinError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InputError(String),

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("media server error: {0}")]
    MediaServerError(String),

    #[error("missing dependency: {0}")]
    MissingDependencyError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, VibinError>;

impl From<vibin_upnp::SoapError> for VibinError {
    fn from(err: vibin_upnp::SoapError) -> Self {
        VibinError::DeviceError(err.to_string())
    }
}

impl From<vibin_didl::DidlError> for VibinError {
    fn from(err: vibin_didl::DidlError) -> Self {
        VibinError::MediaServerError(err.to_string())
    }
}

impl From<vibin_config::StoreError> for VibinError {
    fn from(err: vibin_config::StoreError) -> Self {
        VibinError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for VibinError {
    fn from(err: reqwest::Error) -> Self {
        VibinError::DeviceError(err.to_string())
    }
}
