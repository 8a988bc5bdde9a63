//! Runtime configuration.
//!
//! Everything is read from environment variables so the injector can be
//! configured from its Deployment manifest.

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Default template source (a `kubectl proxy` sidecar in front of the Sidecar CRD)
pub const DEFAULT_TEMPLATE_URL: &str =
    "http://127.0.0.1:8001/apis/pods.injector.com/v1/namespaces/default/sidecars";
/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Default health server port
pub const HEALTH_PORT: u16 = 8080;
/// Default template fetch deadline
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Injector configuration
#[derive(Clone, Debug, PartialEq)]
pub struct InjectorConfig {
    /// Endpoint returning the sidecar template list
    pub template_url: String,
    /// Deadline for a single template fetch
    pub fetch_timeout: Duration,
    /// Admit unmutated when templates cannot be fetched
    pub fail_open: bool,
    pub webhook_port: u16,
    pub cert_path: String,
    pub key_path: String,
    pub health_port: u16,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            template_url: DEFAULT_TEMPLATE_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fail_open: true,
            webhook_port: WEBHOOK_PORT,
            cert_path: WEBHOOK_CERT_PATH.to_string(),
            key_path: WEBHOOK_KEY_PATH.to_string(),
            health_port: HEALTH_PORT,
        }
    }
}

impl InjectorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fail_open = match lookup("INJECTOR_FAIL_OPEN") {
            Some(value) => parse_bool("INJECTOR_FAIL_OPEN", &value)?,
            None => defaults.fail_open,
        };
        if !fail_open {
            warn!("Fail-closed mode: template fetch failures will deny admission");
        }

        let fetch_timeout = match lookup("INJECTOR_FETCH_TIMEOUT_MS") {
            Some(value) => {
                let millis = parse_number::<u64>("INJECTOR_FETCH_TIMEOUT_MS", &value)?;
                if millis == 0 {
                    return Err(Error::Config(
                        "INJECTOR_FETCH_TIMEOUT_MS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_millis(millis)
            }
            None => defaults.fetch_timeout,
        };

        Ok(Self {
            template_url: lookup("INJECTOR_TEMPLATE_URL").unwrap_or(defaults.template_url),
            fetch_timeout,
            fail_open,
            webhook_port: match lookup("WEBHOOK_PORT") {
                Some(value) => parse_number("WEBHOOK_PORT", &value)?,
                None => defaults.webhook_port,
            },
            cert_path: lookup("WEBHOOK_CERT_PATH").unwrap_or(defaults.cert_path),
            key_path: lookup("WEBHOOK_KEY_PATH").unwrap_or(defaults.key_path),
            health_port: match lookup("HEALTH_PORT") {
                Some(value) => parse_number("HEALTH_PORT", &value)?,
                None => defaults.health_port,
            },
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "true" | "on" => Ok(true),
        "0" | "n" | "no" | "false" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}
