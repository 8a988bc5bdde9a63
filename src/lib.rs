//! sidecar-injector library crate
//!
//! A mutating admission webhook that injects sidecar containers into Pods
//! whose `injector` label matches a template fetched from an external store.

pub mod config;
pub mod error;
pub mod health;
pub mod injection;
pub mod templates;
pub mod webhooks;

pub use config::InjectorConfig;
pub use error::{Error, Result};
pub use health::HealthState;
pub use webhooks::{WebhookState, run_webhook_server};
