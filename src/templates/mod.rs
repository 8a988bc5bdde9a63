//! Sidecar template definitions.
//!
//! Templates are read from an external store as a list object:
//!
//! ```json
//! {"items": [{"selector": {"injector": "logging"}, "spec": {"containers": [...]}}]}
//! ```

mod client;

pub use client::{HttpTemplateStore, TemplateFetchError, TemplateStore};

use k8s_openapi::api::core::v1::Container;
use serde::{Deserialize, Serialize};

/// Ordered collection of sidecar templates, as returned by the template store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarTemplateList {
    #[serde(default)]
    pub items: Vec<SidecarTemplate>,
}

/// A single injectable template
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarTemplate {
    pub selector: TemplateSelector,
    pub spec: SidecarSpec,
}

/// Label value a Pod must carry on the `injector` key to receive this template
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSelector {
    pub injector: String,
}

/// Containers injected when the selector matches, in injection order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl SidecarTemplate {
    /// Create a template from a selector value and its containers
    pub fn new(injector: &str, containers: Vec<Container>) -> Self {
        Self {
            selector: TemplateSelector {
                injector: injector.to_string(),
            },
            spec: SidecarSpec { containers },
        }
    }
}
