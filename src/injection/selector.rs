//! Template selection by Pod label.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Container;

use super::INJECTOR_LABEL;
use crate::templates::SidecarTemplateList;

/// Collect the containers of every template whose selector equals the Pod's
/// `injector` label.
///
/// Order is template order, then container order within each template.
/// A Pod without the label gets nothing.
pub fn filter_sidecars(
    labels: Option<&BTreeMap<String, String>>,
    templates: &SidecarTemplateList,
) -> Vec<Container> {
    let Some(injector) = labels.and_then(|l| l.get(INJECTOR_LABEL)) else {
        return Vec::new();
    };

    templates
        .items
        .iter()
        .filter(|t| t.selector.injector == *injector)
        .flat_map(|t| t.spec.containers.iter().cloned())
        .collect()
}
