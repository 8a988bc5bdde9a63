//! Sidecar injection decisions.
//!
//! The admission handler runs these steps in order:
//! - [`eligibility`]: should this Pod be mutated at all
//! - [`selector`]: which template containers apply to it
//! - [`patch`]: the JSON patch that injects them and marks the Pod

pub mod eligibility;
pub mod patch;
pub mod selector;

pub use eligibility::mutation_required;
pub use patch::{PatchOperation, PatchValue, create_patch};
pub use selector::filter_sidecars;

/// Annotation requesting injection (`y`, `yes`, `true`, `on`)
pub const ANNOTATION_INJECT_KEY: &str = "sidecar-injector-webhook.morven.me/inject";
/// Annotation recording that injection already happened
pub const ANNOTATION_STATUS_KEY: &str = "sidecar-injector-webhook.morven.me/status";
/// Value written to [`ANNOTATION_STATUS_KEY`] after injection
pub const STATUS_INJECTED: &str = "injected";
/// Pod label matched against each template's selector
pub const INJECTOR_LABEL: &str = "injector";

/// Namespaces never mutated
pub const IGNORED_NAMESPACES: &[&str] = &["kube-system", "kube-public"];
