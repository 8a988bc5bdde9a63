//! Error types for the injector.
//!
//! Admission-path errors are classified so the handler can decide whether a
//! failure blocks the workload or degrades to an unmutated admission.

use thiserror::Error;

use crate::templates::TemplateFetchError;

/// Error type for injector operations
#[derive(Error, Debug)]
pub enum Error {
    /// Inbound AdmissionReview body could not be decoded
    #[error("could not decode admission review: {0}")]
    EnvelopeDecode(String),

    /// Request payload did not parse as a Pod
    #[error("could not decode pod: {0}")]
    ObjectDecode(String),

    /// Template source unreachable or returned an unusable body
    #[error("template fetch failed: {0}")]
    TemplateFetch(#[from] TemplateFetchError),

    /// Patch document could not be serialized
    #[error("could not encode patch: {0}")]
    PatchEncode(#[source] serde_json::Error),

    /// Outbound AdmissionReview could not be serialized
    #[error("could not encode response: {0}")]
    ResponseEncode(#[source] serde_json::Error),

    /// Invalid runtime configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// Listener or serve loop failure
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Check if this error lets the workload through unmutated when the
    /// injector runs with the fail-open policy.
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Error::TemplateFetch(_))
    }
}

/// Result type alias for injector operations
pub type Result<T> = std::result::Result<T, Error>;
