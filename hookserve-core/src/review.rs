//! Review envelopes exchanged with the orchestrator.
//!
//! These mirror the JSON the orchestrator sends and expects back. Unknown
//! fields are ignored on input so newer orchestrators keep working.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::resource::{GroupVersion, GroupVersionKind, GroupVersionResource};

/// Kind of admission review envelopes.
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";
/// Kind of conversion review envelopes.
pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";
/// Group of admission review envelopes.
pub const ADMISSION_GROUP: &str = "admission.k8s.io";
/// Group of conversion review envelopes.
pub const CONVERSION_GROUP: &str = "apiextensions.k8s.io";
/// Envelope versions accepted for both review kinds.
pub const REVIEW_VERSIONS: &[&str] = &["v1", "v1beta1"];

/// Patch format understood by the orchestrator.
pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

/// The orchestrator's generic status object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// `Success` or `Failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable reason, e.g. `BadRequest`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// HTTP-like status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl Status {
    /// A successful status.
    pub fn success() -> Self {
        Self {
            status: Some("Success".into()),
            ..Default::default()
        }
    }

    /// A failed status.
    pub fn failure(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some("Failure".into()),
            message: Some(message.into()),
            reason: Some(reason.into()),
            code: Some(code),
            ..Default::default()
        }
    }

    /// Turn into a top-level object by filling `kind` and `apiVersion`.
    pub fn into_object(mut self) -> Self {
        self.kind = Some("Status".into());
        self.api_version = Some("v1".into());
        self
    }

    /// Whether this status reports success.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("Success")
    }
}

/// The requesting user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

/// A single admission decision request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Correlates this request with its response.
    pub uid: String,
    /// Kind of the object under review.
    pub kind: GroupVersionKind,
    /// Resource being requested.
    pub resource: GroupVersionResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource: Option<GroupVersionResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// `CREATE`, `UPDATE`, `DELETE` or `CONNECT`.
    pub operation: String,
    pub user_info: UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// A hook's admission decision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Must echo [`AdmissionRequest::uid`].
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Patch bytes, base64 encoded on the wire.
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_annotations: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl AdmissionResponse {
    /// Allow the request.
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            ..Default::default()
        }
    }

    /// Deny the request with a message (HTTP 403 semantics).
    pub fn deny(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(Status::failure(403, "Forbidden", message)),
            ..Default::default()
        }
    }

    /// Attach a JSON patch.
    pub fn with_patch(mut self, patch: impl Into<Vec<u8>>) -> Self {
        self.patch = Some(patch.into());
        self.patch_type = Some(PATCH_TYPE_JSON_PATCH.into());
        self
    }
}

/// Admission envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdmissionReview {
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wrap a request in an `admission.k8s.io/v1` envelope.
    pub fn new(request: AdmissionRequest) -> Self {
        Self {
            api_version: GroupVersion::new(ADMISSION_GROUP, "v1").to_string(),
            kind: ADMISSION_REVIEW_KIND.into(),
            request: Some(request),
            response: None,
        }
    }
}

/// A batch of objects to convert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionRequest {
    pub uid: String,
    /// Target `group/version` for every object.
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    pub objects: Vec<Value>,
}

/// Converted objects, in request order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,
    pub converted_objects: Vec<Value>,
    pub result: Status,
}

impl ConversionResponse {
    /// Successful conversion.
    pub fn success(uid: impl Into<String>, converted_objects: Vec<Value>) -> Self {
        Self {
            uid: uid.into(),
            converted_objects,
            result: Status::success(),
        }
    }

    /// Failed conversion; no objects are returned.
    pub fn failure(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            converted_objects: Vec::new(),
            result: Status {
                status: Some("Failure".into()),
                message: Some(message.into()),
                ..Default::default()
            },
        }
    }
}

/// Conversion envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionReview {
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

impl ConversionReview {
    /// Wrap a request in an `apiextensions.k8s.io/v1` envelope.
    pub fn new(request: ConversionRequest) -> Self {
        Self {
            api_version: GroupVersion::new(CONVERSION_GROUP, "v1").to_string(),
            kind: CONVERSION_REVIEW_KIND.into(),
            request: Some(request),
            response: None,
        }
    }
}

/// Either review envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Admission(AdmissionReview),
    Conversion(ConversionReview),
}

impl Envelope {
    /// UID of the contained request, empty when absent.
    pub fn uid(&self) -> &str {
        match self {
            Envelope::Admission(r) => r.request.as_ref().map_or("", |r| r.uid.as_str()),
            Envelope::Conversion(r) => r.request.as_ref().map_or("", |r| r.uid.as_str()),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Envelope::Admission(r) => serde_json::to_vec(r),
            Envelope::Conversion(r) => serde_json::to_vec(r),
        }
    }
}

impl From<AdmissionReview> for Envelope {
    fn from(review: AdmissionReview) -> Self {
        Envelope::Admission(review)
    }
}

impl From<ConversionReview> for Envelope {
    fn from(review: ConversionReview) -> Self {
        Envelope::Conversion(review)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admission_request_from_wire() {
        let raw = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "samples.example.io", "version": "v1", "kind": "Widget"},
                "resource": {"group": "samples.example.io", "version": "v1", "resource": "widgets"},
                "namespace": "default",
                "operation": "CREATE",
                "userInfo": {"username": "admin", "groups": ["system:masters"]},
                "object": {"metadata": {"name": "w"}},
                "somethingNew": true
            }
        });
        let review: AdmissionReview = serde_json::from_value(raw).unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(request.kind.kind, "Widget");
        assert_eq!(request.resource.resource, "widgets");
        assert_eq!(request.user_info.groups, vec!["system:masters"]);
        assert_eq!(request.object.unwrap()["metadata"]["name"], "w");
    }

    #[test]
    fn test_patch_is_base64_on_the_wire() {
        let response = AdmissionResponse::allow("x").with_patch(b"[]".to_vec());
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["patch"], "W10=");
        assert_eq!(wire["patchType"], "JSONPatch");

        let back: AdmissionResponse = serde_json::from_value(wire).unwrap();
        assert_eq!(back.patch.as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_allow_omits_empty_fields() {
        let wire = serde_json::to_value(AdmissionResponse::allow("u1")).unwrap();
        assert_eq!(wire, json!({"uid": "u1", "allowed": true}));
    }

    #[test]
    fn test_deny_carries_status() {
        let response = AdmissionResponse::deny("u1", "no widgets on fridays");
        let status = response.status.unwrap();
        assert_eq!(status.code, Some(403));
        assert_eq!(status.message.as_deref(), Some("no widgets on fridays"));
        assert!(!response.allowed);
    }

    #[test]
    fn test_conversion_request_field_names() {
        let raw = json!({
            "uid": "c1",
            "desiredAPIVersion": "samples.example.io/v1",
            "objects": [{"apiVersion": "samples.example.io/v1beta1"}]
        });
        let request: ConversionRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.desired_api_version, "samples.example.io/v1");
        assert_eq!(request.objects.len(), 1);

        let response = ConversionResponse::success("c1", vec![]);
        let wire = serde_json::to_value(response).unwrap();
        assert_eq!(wire["result"]["status"], "Success");
        assert!(wire["convertedObjects"].as_array().unwrap().is_empty());
    }
}
