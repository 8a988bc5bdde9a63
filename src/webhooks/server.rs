//! Admission webhook server.
//!
//! Provides the `/mutate` endpoint that the API server calls for Pod CREATE.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a MutatingWebhookConfiguration pointing at `/mutate`
//! 3. Mount the TLS certificate secret at /etc/webhook/certs/

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use kube::core::admission::AdmissionResponse;
use tracing::{debug, error, info, warn};

use super::codec::{AdmissionCodec, JSON_CONTENT_TYPE, PodReview};
use crate::config::InjectorConfig;
use crate::error::{Error, Result};
use crate::health::HealthState;
use crate::injection::{
    ANNOTATION_STATUS_KEY, STATUS_INJECTED, create_patch, filter_sidecars, mutation_required,
};
use crate::templates::TemplateStore;

/// Terminal outcome of one admission review
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Envelope, object or patch could not be processed
    Error,
    /// Eligibility policy said no
    Skipped,
    /// No template matched the Pod
    NoMatch,
    /// Templates unavailable, admitted unmutated
    FetchFailed,
    /// Sidecars injected
    Patched,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Error => "error",
            AdmissionOutcome::Skipped => "skipped",
            AdmissionOutcome::NoMatch => "no_match",
            AdmissionOutcome::FetchFailed => "fetch_failed",
            AdmissionOutcome::Patched => "patched",
        }
    }
}

/// Shared state for webhook handlers
pub struct WebhookState {
    pub templates: Arc<dyn TemplateStore>,
    pub codec: AdmissionCodec,
    /// Admit unmutated when templates cannot be fetched
    pub fail_open: bool,
    pub health_state: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(templates: Arc<dyn TemplateStore>, fail_open: bool) -> Self {
        Self {
            templates,
            codec: AdmissionCodec::new(),
            fail_open,
            health_state: None,
        }
    }

    /// Attach a health state for metrics
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    fn record(&self, outcome: AdmissionOutcome, started: Instant) {
        if let Some(ref health) = self.health_state {
            health
                .metrics
                .record_admission(outcome.as_str(), started.elapsed().as_secs_f64());
        }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate_handler))
        .with_state(state)
}

/// Mutating admission handler
///
/// Transport checks (empty body, Content-Type) are answered with plain-text
/// HTTP errors. Every decodable request gets a 200 with an AdmissionReview.
async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    if body.is_empty() {
        error!("Empty admission request body");
        return (StatusCode::BAD_REQUEST, "empty body").into_response();
    }

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if !state.codec.accepts(content_type) {
        error!(content_type = ?content_type, "Unsupported Content-Type, expected application/json");
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "invalid Content-Type, expect `application/json`",
        )
            .into_response();
    }

    let (outcome, response) = match state.codec.decode_review(&body) {
        Ok(review) => mutate(&state, &review).await,
        Err(e) => {
            error!(error = %e, "Failed to decode admission review");
            (AdmissionOutcome::Error, AdmissionResponse::invalid(e.to_string()))
        }
    };
    state.record(outcome, started);

    match state.codec.encode_review(response) {
        Ok(bytes) => (StatusCode::OK, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode admission response");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Run the injection pipeline for one decoded request.
///
/// Eligibility is checked before templates are fetched, so Pods that are
/// already injected or opted out never reach the template store.
pub async fn mutate(
    state: &WebhookState,
    review: &PodReview,
) -> (AdmissionOutcome, AdmissionResponse) {
    let request = &review.request;
    let uid = &request.uid;

    let pod = match state.codec.decode_pod(review) {
        Ok(pod) => pod,
        Err(e) => {
            error!(uid = %uid, error = %e, "Could not decode pod");
            return (
                AdmissionOutcome::Error,
                AdmissionResponse::from(request).deny(e.to_string()),
            );
        }
    };

    // Pods on CREATE usually carry no namespace of their own
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .or(request.namespace.as_deref())
        .unwrap_or_default();
    let pod_name = pod
        .metadata
        .name
        .as_deref()
        .or(pod.metadata.generate_name.as_deref())
        .unwrap_or_default();

    info!(
        uid = %uid,
        kind = %request.kind.kind,
        namespace = %namespace,
        name = %request.name,
        pod = %pod_name,
        operation = ?request.operation,
        user = ?request.user_info.username,
        "Processing admission request"
    );

    if !mutation_required(namespace, pod.metadata.annotations.as_ref()) {
        info!(uid = %uid, namespace = %namespace, pod = %pod_name, "Skipping mutation due to policy check");
        return (AdmissionOutcome::Skipped, AdmissionResponse::from(request));
    }

    let templates = match state.templates.fetch_templates().await {
        Ok(templates) => templates,
        Err(e) => {
            let err = Error::from(e);
            if let Some(ref health) = state.health_state {
                health.metrics.record_fetch_error();
            }
            if state.fail_open && err.is_fail_open() {
                warn!(uid = %uid, error = %err, "Template fetch failed, admitting unmutated");
                return (AdmissionOutcome::FetchFailed, AdmissionResponse::from(request));
            }
            error!(uid = %uid, error = %err, "Template fetch failed, denying admission");
            return (
                AdmissionOutcome::Error,
                AdmissionResponse::from(request).deny(err.to_string()),
            );
        }
    };

    let sidecars = filter_sidecars(pod.metadata.labels.as_ref(), &templates);
    if sidecars.is_empty() {
        info!(uid = %uid, pod = %pod_name, "No sidecar template matched");
        return (AdmissionOutcome::NoMatch, AdmissionResponse::from(request));
    }

    let names: Vec<&str> = sidecars.iter().map(|c| c.name.as_str()).collect();
    info!(uid = %uid, pod = %pod_name, sidecars = ?names, "Injecting sidecars");

    let annotations =
        BTreeMap::from([(ANNOTATION_STATUS_KEY.to_string(), STATUS_INJECTED.to_string())]);
    let patch = match create_patch(&pod, &sidecars, &annotations) {
        Ok(patch) => patch,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to build patch");
            return (
                AdmissionOutcome::Error,
                AdmissionResponse::from(request).deny(e.to_string()),
            );
        }
    };
    debug!(
        uid = %uid,
        patch = %serde_json::to_string(&patch).unwrap_or_default(),
        "Generated patch"
    );

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => {
            if let Some(ref health) = state.health_state {
                health.metrics.record_injected(sidecars.len());
            }
            (AdmissionOutcome::Patched, response)
        }
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            (
                AdmissionOutcome::Error,
                AdmissionResponse::from(request).deny(format!("could not encode patch: {e}")),
            )
        }
    }
}

/// Run the webhook server with TLS
///
/// TLS certificates are loaded from the configured PEM files.
pub async fn run_webhook_server(state: Arc<WebhookState>, config: &InjectorConfig) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let app = create_webhook_router(state);

    let tls = RustlsConfig::from_pem_file(
        PathBuf::from(&config.cert_path),
        PathBuf::from(&config.key_path),
    )
    .await
    .map_err(|e| Error::Tls(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    info!(port = config.webhook_port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
