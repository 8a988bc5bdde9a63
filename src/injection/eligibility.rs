//! Eligibility policy.
//!
//! Evaluated in order:
//! 1. Pods in an ignored namespace are never mutated
//! 2. Pods whose status annotation is `injected` are already done
//! 3. Otherwise the inject annotation must carry a truthy token

use std::collections::BTreeMap;

use tracing::info;

use super::{ANNOTATION_INJECT_KEY, ANNOTATION_STATUS_KEY, IGNORED_NAMESPACES, STATUS_INJECTED};

const TRUTHY_TOKENS: &[&str] = &["y", "yes", "true", "on"];

/// Decide whether a Pod should be mutated
pub fn mutation_required(namespace: &str, annotations: Option<&BTreeMap<String, String>>) -> bool {
    if IGNORED_NAMESPACES.contains(&namespace) {
        info!(namespace = %namespace, "Skipping mutation in ignored namespace");
        return false;
    }

    let lookup = |key: &str| {
        annotations
            .and_then(|a| a.get(key))
            .map(String::as_str)
            .unwrap_or_default()
    };

    let status = lookup(ANNOTATION_STATUS_KEY);
    let required = if status.eq_ignore_ascii_case(STATUS_INJECTED) {
        false
    } else {
        let inject = lookup(ANNOTATION_INJECT_KEY);
        TRUTHY_TOKENS.iter().any(|t| inject.eq_ignore_ascii_case(t))
    };

    info!(
        namespace = %namespace,
        status = %status,
        required,
        "Evaluated mutation policy"
    );
    required
}
