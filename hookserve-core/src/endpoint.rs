//! # Review endpoint
//!
//! A [`ReviewEndpoint`] binds exactly one hook role to one route. It is the
//! single-object transform the serving framework calls for every review:
//! decode the body into the endpoint's envelope type, hand the request to
//! the hook, and write the hook's answer back into the same envelope.
//!
//! Endpoints own nothing but the hook reference, so they are shared across
//! concurrent requests without synchronization.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::{
    error::{ReviewError, panic_message},
    hook::{ConversionHook, MutatingHook, ValidatingHook},
    resource::{GroupVersion, GroupVersionKind},
    review::{
        ADMISSION_GROUP, ADMISSION_REVIEW_KIND, AdmissionRequest, AdmissionResponse,
        AdmissionReview, CONVERSION_GROUP, CONVERSION_REVIEW_KIND, ConversionResponse,
        ConversionReview, Envelope, REVIEW_VERSIONS, Status,
    },
};

/// Which role an endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Validating,
    Mutating,
    Converting,
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EndpointKind::Validating => "validating",
            EndpointKind::Mutating => "mutating",
            EndpointKind::Converting => "converting",
        })
    }
}

/// A route's handler: one hook role.
#[derive(Clone)]
pub enum ReviewEndpoint {
    Validating(Arc<dyn ValidatingHook>),
    Mutating(Arc<dyn MutatingHook>),
    Converting(Arc<dyn ConversionHook>),
}

impl std::fmt::Debug for ReviewEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReviewEndpoint").field(&self.kind()).finish()
    }
}

impl ReviewEndpoint {
    /// The role served.
    pub fn kind(&self) -> EndpointKind {
        match self {
            ReviewEndpoint::Validating(_) => EndpointKind::Validating,
            ReviewEndpoint::Mutating(_) => EndpointKind::Mutating,
            ReviewEndpoint::Converting(_) => EndpointKind::Converting,
        }
    }

    /// Review resources are never namespaced.
    pub fn namespaced(&self) -> bool {
        false
    }

    /// The kind this endpoint consumes and produces, for discovery.
    pub fn produced_kind(&self) -> GroupVersionKind {
        match self {
            ReviewEndpoint::Validating(_) | ReviewEndpoint::Mutating(_) => {
                GroupVersion::new(ADMISSION_GROUP, "v1").with_kind(ADMISSION_REVIEW_KIND)
            }
            ReviewEndpoint::Converting(_) => {
                GroupVersion::new(CONVERSION_GROUP, "v1").with_kind(CONVERSION_REVIEW_KIND)
            }
        }
    }

    /// Verbs served on the resource.
    pub fn verbs(&self) -> &'static [&'static str] {
        &["create"]
    }

    /// Decode a request body into this endpoint's envelope type.
    pub fn decode(&self, body: &[u8]) -> Result<Envelope, ReviewError> {
        match self {
            ReviewEndpoint::Validating(_) | ReviewEndpoint::Mutating(_) => {
                let review: AdmissionReview = serde_json::from_slice(body)?;
                check_envelope(
                    &review.api_version,
                    &review.kind,
                    ADMISSION_GROUP,
                    ADMISSION_REVIEW_KIND,
                )?;
                if review.request.is_none() {
                    return Err(ReviewError::MissingRequest {
                        kind: ADMISSION_REVIEW_KIND,
                    });
                }
                Ok(Envelope::Admission(review))
            }
            ReviewEndpoint::Converting(_) => {
                let review: ConversionReview = serde_json::from_slice(body)?;
                check_envelope(
                    &review.api_version,
                    &review.kind,
                    CONVERSION_GROUP,
                    CONVERSION_REVIEW_KIND,
                )?;
                if review.request.is_none() {
                    return Err(ReviewError::MissingRequest {
                        kind: CONVERSION_REVIEW_KIND,
                    });
                }
                Ok(Envelope::Conversion(review))
            }
        }
    }

    /// Run the bound hook and write its answer into the envelope.
    ///
    /// The hook's response is returned verbatim. A panicking hook produces a
    /// failure response carrying the request UID instead of unwinding into
    /// the caller.
    pub fn create(&self, envelope: Envelope) -> Result<Envelope, ReviewError> {
        match (self, envelope) {
            (ReviewEndpoint::Validating(hook), Envelope::Admission(mut review)) => {
                let request = take_admission_request(&mut review)?;
                review.response = Some(guard_admission(&request, |r| hook.validate(r)));
                review.request = Some(request);
                Ok(Envelope::Admission(review))
            }
            (ReviewEndpoint::Mutating(hook), Envelope::Admission(mut review)) => {
                let request = take_admission_request(&mut review)?;
                review.response = Some(guard_admission(&request, |r| hook.admit(r)));
                review.request = Some(request);
                Ok(Envelope::Admission(review))
            }
            (ReviewEndpoint::Converting(hook), Envelope::Conversion(mut review)) => {
                let request = review.request.take().ok_or(ReviewError::MissingRequest {
                    kind: CONVERSION_REVIEW_KIND,
                })?;
                let response = catch_unwind(AssertUnwindSafe(|| hook.convert(&request)))
                    .unwrap_or_else(|payload| {
                        ConversionResponse {
                            uid: request.uid.clone(),
                            converted_objects: Vec::new(),
                            result: Status::failure(
                                500,
                                "InternalError",
                                format!(
                                    "conversion hook panicked: {}",
                                    panic_message(payload.as_ref())
                                ),
                            ),
                        }
                    });
                review.response = Some(response);
                review.request = Some(request);
                Ok(Envelope::Conversion(review))
            }
            (_, Envelope::Admission(r)) => Err(ReviewError::UnsupportedEnvelope {
                api_version: r.api_version,
                kind: r.kind,
                expected: CONVERSION_REVIEW_KIND,
            }),
            (_, Envelope::Conversion(r)) => Err(ReviewError::UnsupportedEnvelope {
                api_version: r.api_version,
                kind: r.kind,
                expected: ADMISSION_REVIEW_KIND,
            }),
        }
    }
}

fn check_envelope(
    api_version: &str,
    kind: &str,
    group: &str,
    expected: &'static str,
) -> Result<(), ReviewError> {
    let gv = GroupVersion::parse(api_version);
    if kind != expected || gv.group != group || !REVIEW_VERSIONS.contains(&gv.version.as_str()) {
        return Err(ReviewError::UnsupportedEnvelope {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            expected,
        });
    }
    Ok(())
}

fn take_admission_request(review: &mut AdmissionReview) -> Result<AdmissionRequest, ReviewError> {
    review.request.take().ok_or(ReviewError::MissingRequest {
        kind: ADMISSION_REVIEW_KIND,
    })
}

fn guard_admission(
    request: &AdmissionRequest,
    transform: impl FnOnce(&AdmissionRequest) -> AdmissionResponse,
) -> AdmissionResponse {
    catch_unwind(AssertUnwindSafe(|| transform(request))).unwrap_or_else(|payload| {
        AdmissionResponse {
            uid: request.uid.clone(),
            allowed: false,
            status: Some(Status::failure(
                500,
                "InternalError",
                format!("admission hook panicked: {}", panic_message(payload.as_ref())),
            )),
            ..Default::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resource::ResourceDescriptor, review::ConversionRequest};
    use serde_json::json;

    struct Widgets;

    impl ValidatingHook for Widgets {
        fn validating_resource(&self) -> ResourceDescriptor {
            ResourceDescriptor::new("samples.example.io", "v1", "widgets", "widget")
        }

        fn validate(&self, request: &AdmissionRequest) -> AdmissionResponse {
            AdmissionResponse::allow(&request.uid)
        }
    }

    impl MutatingHook for Widgets {
        fn mutating_resource(&self) -> ResourceDescriptor {
            ResourceDescriptor::new("samples.example.io", "v1", "widgetmutations", "")
        }

        fn admit(&self, request: &AdmissionRequest) -> AdmissionResponse {
            if request.operation == "DELETE" {
                panic!("deletes are not expected");
            }
            AdmissionResponse::allow(&request.uid).with_patch(b"{}".to_vec())
        }
    }

    struct Upgrader;

    impl ConversionHook for Upgrader {
        fn conversion_resource(&self) -> ResourceDescriptor {
            ResourceDescriptor::new("samples.example.io", "v1", "widgetconversions", "")
        }

        fn convert(&self, request: &ConversionRequest) -> ConversionResponse {
            let objects = request
                .objects
                .iter()
                .map(|o| {
                    let mut o = o.clone();
                    o["apiVersion"] = json!(request.desired_api_version);
                    o
                })
                .collect();
            ConversionResponse::success(&request.uid, objects)
        }
    }

    fn admission_body(uid: &str, operation: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {"uid": uid, "kind": {"kind": "Widget"}, "operation": operation}
        }))
        .unwrap()
    }

    #[test]
    fn test_validating_writes_response() {
        let endpoint = ReviewEndpoint::Validating(Arc::new(Widgets));
        let envelope = endpoint.decode(&admission_body("u-1", "CREATE")).unwrap();
        let Envelope::Admission(review) = endpoint.create(envelope).unwrap() else {
            panic!("expected admission envelope");
        };
        let response = review.response.unwrap();
        assert!(response.allowed);
        assert_eq!(response.uid, "u-1");
        assert_eq!(review.request.unwrap().uid, "u-1");
        assert_eq!(review.api_version, "admission.k8s.io/v1");
    }

    #[test]
    fn test_create_is_idempotent() {
        let endpoint = ReviewEndpoint::Mutating(Arc::new(Widgets));
        let envelope = endpoint.decode(&admission_body("u-2", "CREATE")).unwrap();
        let first = endpoint.create(envelope.clone()).unwrap();
        let second = endpoint.create(envelope).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_panic_becomes_denial() {
        let endpoint = ReviewEndpoint::Mutating(Arc::new(Widgets));
        let envelope = endpoint.decode(&admission_body("u-3", "DELETE")).unwrap();
        let Envelope::Admission(review) = endpoint.create(envelope).unwrap() else {
            panic!("expected admission envelope");
        };
        let response = review.response.unwrap();
        assert!(!response.allowed);
        assert_eq!(response.uid, "u-3");
        let status = response.status.unwrap();
        assert_eq!(status.code, Some(500));
        assert!(status.message.unwrap().contains("deletes are not expected"));
    }

    #[test]
    fn test_v1beta1_envelope_accepted() {
        let endpoint = ReviewEndpoint::Validating(Arc::new(Widgets));
        let body = serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1beta1",
            "kind": "AdmissionReview",
            "request": {"uid": "b1"}
        }))
        .unwrap();
        let Envelope::Admission(review) = endpoint.create(endpoint.decode(&body).unwrap()).unwrap()
        else {
            panic!("expected admission envelope");
        };
        assert_eq!(review.api_version, "admission.k8s.io/v1beta1");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let endpoint = ReviewEndpoint::Validating(Arc::new(Widgets));
        assert!(matches!(endpoint.decode(b"{not json"), Err(ReviewError::Decode(_))));

        let missing = br#"{"apiVersion":"admission.k8s.io/v1","kind":"AdmissionReview"}"#;
        assert!(matches!(
            endpoint.decode(missing),
            Err(ReviewError::MissingRequest { .. })
        ));

        let wrong =
            br#"{"apiVersion":"apiextensions.k8s.io/v1","kind":"ConversionReview","request":{}}"#;
        assert!(matches!(
            endpoint.decode(wrong),
            Err(ReviewError::UnsupportedEnvelope { .. })
        ));
    }

    #[test]
    fn test_conversion_preserves_order() {
        let endpoint = ReviewEndpoint::Converting(Arc::new(Upgrader));
        let review = ConversionReview::new(ConversionRequest {
            uid: "c-1".into(),
            desired_api_version: "samples.example.io/v1".into(),
            objects: vec![
                json!({"apiVersion": "samples.example.io/v1beta1", "metadata": {"name": "a"}}),
                json!({"apiVersion": "samples.example.io/v1beta1", "metadata": {"name": "b"}}),
            ],
        });
        let Envelope::Conversion(review) = endpoint.create(review.into()).unwrap() else {
            panic!("expected conversion envelope");
        };
        let response = review.response.unwrap();
        assert!(response.result.is_success());
        let names: Vec<_> = response
            .converted_objects
            .iter()
            .map(|o| o["metadata"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert!(
            response
                .converted_objects
                .iter()
                .all(|o| o["apiVersion"] == "samples.example.io/v1")
        );
    }

    #[test]
    fn test_mismatched_envelope_is_rejected() {
        let endpoint = ReviewEndpoint::Converting(Arc::new(Upgrader));
        let envelope = Envelope::Admission(AdmissionReview::new(AdmissionRequest::default()));
        assert!(matches!(
            endpoint.create(envelope),
            Err(ReviewError::UnsupportedEnvelope { .. })
        ));
    }

    #[test]
    fn test_discovery_facts() {
        let endpoint = ReviewEndpoint::Converting(Arc::new(Upgrader));
        assert!(!endpoint.namespaced());
        assert_eq!(endpoint.produced_kind().kind, "ConversionReview");
        assert_eq!(endpoint.produced_kind().group, "apiextensions.k8s.io");
        assert_eq!(endpoint.verbs(), ["create"]);
    }
}
