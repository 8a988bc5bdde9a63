//! AdmissionReview encoding and decoding.
//!
//! A single [`AdmissionCodec`] is built at startup and shared read-only by
//! every request. The reviewed object is kept as raw JSON while the envelope
//! is decoded, so a malformed Pod is reported against a known request uid.

use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};

use crate::error::{Error, Result};

/// Media type accepted on the admission endpoint
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A decoded admission request whose object has not been interpreted yet
#[derive(Clone, Debug)]
pub struct PodReview {
    pub request: AdmissionRequest<DynamicObject>,
    object: Option<serde_json::Value>,
}

/// Codec for the admission.k8s.io review envelope
#[derive(Clone, Debug)]
pub struct AdmissionCodec {
    media_type: &'static str,
}

impl Default for AdmissionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionCodec {
    pub fn new() -> Self {
        Self {
            media_type: JSON_CONTENT_TYPE,
        }
    }

    /// Check a Content-Type header value, ignoring parameters such as charset
    pub fn accepts(&self, content_type: Option<&str>) -> bool {
        content_type
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case(self.media_type))
    }

    /// Decode the inbound envelope and extract its request
    pub fn decode_review(&self, body: &[u8]) -> Result<PodReview> {
        let mut envelope: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| Error::EnvelopeDecode(e.to_string()))?;

        // Only `object` is ever read; `oldObject` is dropped with it
        let object = envelope
            .get_mut("request")
            .and_then(serde_json::Value::as_object_mut)
            .and_then(|request| {
                request.remove("oldObject");
                request.remove("object")
            })
            .filter(|object| !object.is_null());

        let review: AdmissionReview<DynamicObject> =
            serde_json::from_value(envelope).map_err(|e| Error::EnvelopeDecode(e.to_string()))?;
        let request = review
            .try_into()
            .map_err(|e: kube::core::admission::ConvertAdmissionReviewError| {
                Error::EnvelopeDecode(e.to_string())
            })?;

        Ok(PodReview { request, object })
    }

    /// Decode the review's raw object as a Pod
    pub fn decode_pod(&self, review: &PodReview) -> Result<Pod> {
        let object = review
            .object
            .as_ref()
            .ok_or_else(|| Error::ObjectDecode("request has no object".to_string()))?;

        serde_json::from_value(object.clone()).map_err(|e| Error::ObjectDecode(e.to_string()))
    }

    /// Wrap a response in an envelope and serialize it
    pub fn encode_review(&self, response: AdmissionResponse) -> Result<Vec<u8>> {
        serde_json::to_vec(&response.into_review()).map_err(Error::ResponseEncode)
    }
}
