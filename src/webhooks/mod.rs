//! Mutating admission webhook.
//!
//! Decodes AdmissionReview envelopes, runs the injection pipeline and
//! answers with a JSON patch when sidecars apply.

mod codec;
mod server;

pub use codec::{AdmissionCodec, JSON_CONTENT_TYPE, PodReview};
pub use server::{
    AdmissionOutcome, WebhookState, create_webhook_router, mutate, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
