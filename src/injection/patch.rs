//! JSON patch generation.
//!
//! Operations are emitted in application order: container additions first,
//! then annotation updates. Existing array elements are never modified.

use std::collections::BTreeMap;

use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, ReplaceOperation};
use k8s_openapi::api::core::v1::{Container, Pod};
use serde::Serialize;

use crate::error::{Error, Result};

const CONTAINERS_PATH: [&str; 2] = ["spec", "containers"];
const ANNOTATIONS_PATH: [&str; 2] = ["metadata", "annotations"];

/// Values the injector places in a patch
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatchValue {
    /// Establishes an empty container array
    ContainerList(Vec<Container>),
    /// Appended to an existing container array
    Container(Box<Container>),
    /// Establishes the annotation map
    Annotations(BTreeMap<String, String>),
    /// A single annotation value
    Text(String),
}

/// A single patch operation
#[derive(Clone, Debug, PartialEq)]
pub enum PatchOperation {
    Add { path: PointerBuf, value: PatchValue },
    Replace { path: PointerBuf, value: PatchValue },
}

impl PatchOperation {
    pub fn path(&self) -> &PointerBuf {
        match self {
            PatchOperation::Add { path, .. } | PatchOperation::Replace { path, .. } => path,
        }
    }

    pub fn value(&self) -> &PatchValue {
        match self {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => value,
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, PatchOperation::Add { .. })
    }

    fn into_json_patch(self) -> std::result::Result<json_patch::PatchOperation, serde_json::Error> {
        Ok(match self {
            PatchOperation::Add { path, value } => json_patch::PatchOperation::Add(AddOperation {
                path,
                value: serde_json::to_value(&value)?,
            }),
            PatchOperation::Replace { path, value } => {
                json_patch::PatchOperation::Replace(ReplaceOperation {
                    path,
                    value: serde_json::to_value(&value)?,
                })
            }
        })
    }
}

/// Operations appending `added` to a container array currently holding `target`.
///
/// An empty array is established by the first container as a one-element
/// list; every other container is appended with `/-`.
pub fn add_containers(target: &[Container], added: &[Container]) -> Vec<PatchOperation> {
    let mut first = target.is_empty();
    added
        .iter()
        .map(|container| {
            if first {
                first = false;
                PatchOperation::Add {
                    path: PointerBuf::from_tokens(CONTAINERS_PATH),
                    value: PatchValue::ContainerList(vec![container.clone()]),
                }
            } else {
                PatchOperation::Add {
                    path: PointerBuf::from_tokens(["spec", "containers", "-"]),
                    value: PatchValue::Container(Box::new(container.clone())),
                }
            }
        })
        .collect()
}

/// Operations writing `added` into the annotation map currently holding `target`.
///
/// A key with no existing non-empty value is written by adding the map
/// itself with that single entry; a key already set is replaced in place.
pub fn update_annotations(
    target: Option<&BTreeMap<String, String>>,
    added: &BTreeMap<String, String>,
) -> Vec<PatchOperation> {
    let mut established = false;
    let mut ops = Vec::with_capacity(added.len());

    for (key, value) in added {
        let existing = target.and_then(|t| t.get(key)).filter(|v| !v.is_empty());
        let op = match existing {
            None if !established => {
                established = true;
                PatchOperation::Add {
                    path: PointerBuf::from_tokens(ANNOTATIONS_PATH),
                    value: PatchValue::Annotations(BTreeMap::from([(key.clone(), value.clone())])),
                }
            }
            // Map already rebuilt by an earlier op in this patch
            None => PatchOperation::Add {
                path: PointerBuf::from_tokens(["metadata", "annotations", key.as_str()]),
                value: PatchValue::Text(value.clone()),
            },
            Some(_) => PatchOperation::Replace {
                path: PointerBuf::from_tokens(["metadata", "annotations", key.as_str()]),
                value: PatchValue::Text(value.clone()),
            },
        };
        ops.push(op);
    }
    ops
}

/// Ordered operations injecting `sidecars` into `pod` and applying `annotations`
pub fn patch_operations(
    pod: &Pod,
    sidecars: &[Container],
    annotations: &BTreeMap<String, String>,
) -> Vec<PatchOperation> {
    let existing = pod
        .spec
        .as_ref()
        .map(|s| s.containers.as_slice())
        .unwrap_or_default();

    let mut ops = add_containers(existing, sidecars);
    ops.extend(update_annotations(
        pod.metadata.annotations.as_ref(),
        annotations,
    ));
    ops
}

/// Build the JSON patch for a mutation
pub fn create_patch(
    pod: &Pod,
    sidecars: &[Container],
    annotations: &BTreeMap<String, String>,
) -> Result<Patch> {
    let ops = patch_operations(pod, sidecars, annotations)
        .into_iter()
        .map(PatchOperation::into_json_patch)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::PatchEncode)?;
    Ok(Patch(ops))
}
