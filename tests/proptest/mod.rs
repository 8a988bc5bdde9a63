// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for sidecar-injector.
//!
//! Uses proptest to generate random inputs and verify invariants.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use proptest::prelude::*;

use sidecar_injector::injection::patch::{PatchValue, add_containers, patch_operations};
use sidecar_injector::injection::{
    ANNOTATION_INJECT_KEY, ANNOTATION_STATUS_KEY, IGNORED_NAMESPACES, filter_sidecars,
    mutation_required,
};
use sidecar_injector::templates::{SidecarTemplate, SidecarTemplateList};

/// Strategy for arbitrary annotation maps that may include the injector keys.
fn any_annotations() -> impl Strategy<Value = BTreeMap<String, String>> {
    let key = prop_oneof![
        Just(ANNOTATION_INJECT_KEY.to_string()),
        Just(ANNOTATION_STATUS_KEY.to_string()),
        "[a-z]{1,8}",
    ];
    prop::collection::btree_map(key, "[a-zA-Z]{0,8}", 0..4)
}

/// Strategy for a word with randomized letter casing.
fn random_case(word: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn truthy_token() -> impl Strategy<Value = String> {
    prop_oneof![
        random_case("y"),
        random_case("yes"),
        random_case("true"),
        random_case("on"),
    ]
}

fn containers(prefix: &'static str, max: usize) -> impl Strategy<Value = Vec<Container>> {
    (0..=max).prop_map(move |n| {
        (0..n)
            .map(|i| Container {
                name: format!("{prefix}-{i}"),
                ..Default::default()
            })
            .collect()
    })
}

proptest! {
    /// Ignored namespaces are never mutated, whatever the annotations say.
    #[test]
    fn prop_ignored_namespace_never_required(
        idx in 0..IGNORED_NAMESPACES.len(),
        annotations in any_annotations(),
    ) {
        prop_assert!(!mutation_required(IGNORED_NAMESPACES[idx], Some(&annotations)));
    }

    /// The status guard wins over any inject value.
    #[test]
    fn prop_injected_status_never_required(
        status in random_case("injected"),
        inject in truthy_token(),
    ) {
        let annotations = BTreeMap::from([
            (ANNOTATION_STATUS_KEY.to_string(), status),
            (ANNOTATION_INJECT_KEY.to_string(), inject),
        ]);
        prop_assert!(!mutation_required("default", Some(&annotations)));
    }

    /// Any casing of a truthy token requests injection.
    #[test]
    fn prop_truthy_tokens_required(token in truthy_token()) {
        let annotations = BTreeMap::from([(ANNOTATION_INJECT_KEY.to_string(), token)]);
        prop_assert!(mutation_required("default", Some(&annotations)));
    }

    /// Anything that is not a truthy token does not.
    #[test]
    fn prop_other_tokens_not_required(token in "[a-zA-Z0-9 ]{0,6}") {
        let lowered = token.to_ascii_lowercase();
        prop_assume!(!["y", "yes", "true", "on"].contains(&lowered.as_str()));
        let annotations = BTreeMap::from([(ANNOTATION_INJECT_KEY.to_string(), token)]);
        prop_assert!(!mutation_required("default", Some(&annotations)));
    }

    /// A label selects exactly the templates with an identical selector string.
    #[test]
    fn prop_selector_is_exact(
        label in "[a-zA-Z]{1,6}",
        selectors in prop::collection::vec("[a-zA-Z]{1,6}", 0..6),
    ) {
        let templates = SidecarTemplateList {
            items: selectors
                .iter()
                .map(|s| SidecarTemplate::new(s, vec![Container { name: s.clone(), ..Default::default() }]))
                .collect(),
        };
        let labels = BTreeMap::from([("injector".to_string(), label.clone())]);

        let selected = filter_sidecars(Some(&labels), &templates);
        let expected = selectors.iter().filter(|s| **s == label).count();
        prop_assert_eq!(selected.len(), expected);
        prop_assert!(selected.iter().all(|c| c.name == label));
    }

    /// Every injected container gets its own add; only an empty array is
    /// established with a one-element list, and order is preserved.
    #[test]
    fn prop_container_ops_shape(
        existing in containers("app", 3),
        added in containers("sidecar", 5),
    ) {
        let ops = add_containers(&existing, &added);
        prop_assert_eq!(ops.len(), added.len());

        for (i, op) in ops.iter().enumerate() {
            prop_assert!(op.is_add());
            if i == 0 && existing.is_empty() {
                prop_assert_eq!(op.path().as_str(), "/spec/containers");
                prop_assert_eq!(op.value(), &PatchValue::ContainerList(vec![added[i].clone()]));
            } else {
                prop_assert_eq!(op.path().as_str(), "/spec/containers/-");
                prop_assert_eq!(op.value(), &PatchValue::Container(Box::new(added[i].clone())));
            }
        }
    }

    /// The status annotation is written by exactly one operation, never both
    /// add and replace.
    #[test]
    fn prop_single_status_op(annotations in prop::option::of(any_annotations())) {
        let pod = Pod {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                annotations: annotations.clone(),
                ..Default::default()
            },
            spec: Some(PodSpec::default()),
            status: None,
        };
        let update = BTreeMap::from([(ANNOTATION_STATUS_KEY.to_string(), "injected".to_string())]);
        let ops = patch_operations(&pod, &[], &update);

        prop_assert_eq!(ops.len(), 1);
        let has_value = annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_STATUS_KEY))
            .is_some_and(|v| !v.is_empty());
        prop_assert_eq!(ops[0].is_add(), !has_value);
    }
}
