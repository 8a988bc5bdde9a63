//! Template store client.
//!
//! Templates are fetched fresh on every admission request. There is no cache
//! and no retry; any failure is reported as a single [`TemplateFetchError`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::SidecarTemplateList;

/// Errors returned while fetching sidecar templates
#[derive(Error, Debug)]
pub enum TemplateFetchError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The configured deadline expired
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The template source answered with a non-success status
    #[error("template source returned HTTP {0}")]
    Status(u16),

    /// Body was not JSON or did not match the template list shape
    #[error("malformed template list: {0}")]
    Malformed(String),
}

/// Source of sidecar templates
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch the current template collection
    async fn fetch_templates(&self) -> Result<SidecarTemplateList, TemplateFetchError>;
}

/// Template store backed by a plain HTTP GET against a fixed endpoint
pub struct HttpTemplateStore {
    url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpTemplateStore {
    /// Create a store that reads `url` with the given request deadline
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TemplateFetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TemplateFetchError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            timeout,
            http_client,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> TemplateFetchError {
        if err.is_timeout() {
            TemplateFetchError::Timeout(self.timeout)
        } else {
            TemplateFetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl TemplateStore for HttpTemplateStore {
    async fn fetch_templates(&self) -> Result<SidecarTemplateList, TemplateFetchError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TemplateFetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        let templates: SidecarTemplateList = serde_json::from_slice(&body)
            .map_err(|e| TemplateFetchError::Malformed(e.to_string()))?;

        debug!(
            url = %self.url,
            templates = templates.items.len(),
            "Fetched sidecar templates"
        );
        Ok(templates)
    }
}
