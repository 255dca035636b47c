//! The review route and its error responses.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use hookserve_core::{HookError, Status};
use hookserve_std::{dispatch::DispatchError, lifecycle::HookState};

use super::SharedState;

/// A request that could not be answered with an envelope.
#[derive(Debug)]
pub(crate) enum ApiError {
    NotFound(String),
    MethodNotAllowed(String),
    UnsupportedMediaType(String),
    Body(BytesRejection),
    Unavailable(String),
    Dispatch(DispatchError),
    Internal(String),
}

impl ApiError {
    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub(crate) fn method_not_allowed(msg: impl Into<String>) -> Self {
        ApiError::MethodNotAllowed(msg.into())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Dispatch(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, reason) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedMediaType")
            }
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "RequestEntityTooLarge")
            }
            ApiError::Body(rejection) => (rejection.status(), "BadRequest"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable"),
            ApiError::Dispatch(DispatchError::Review(_)) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Dispatch(DispatchError::Hook(HookError::Timeout(_))) => {
                (StatusCode::GATEWAY_TIMEOUT, "Timeout")
            }
            ApiError::Dispatch(DispatchError::Hook(HookError::Saturated(_))) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable")
            }
            ApiError::Dispatch(DispatchError::Hook(_)) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        };
        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => msg,
            ApiError::Body(rejection) => rejection.body_text(),
            ApiError::Dispatch(err) => err.to_string(),
        };
        let status = Status::failure(code.as_u16(), reason, message).into_object();
        (code, Json(status)).into_response()
    }
}

/// `POST /apis/{group}/{version}/{resource}`
///
/// A hook whose initializer failed is not served; its routes answer 503.
pub(crate) async fn review(
    State(state): State<SharedState>,
    Path((group, version, resource)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    check_content_type(&headers)?;
    let body = body?;

    let entry = state
        .groups
        .get(&group)
        .and_then(|g| g.routes.lookup(&version, &resource))
        .ok_or_else(|| {
            ApiError::not_found(format!("{resource}.{version}.{group} is not served"))
        })?;

    if let Some(HookState::Failed(reason)) = state.status.state(&entry.init_hook) {
        return Err(ApiError::Unavailable(format!(
            "{resource}.{version}.{group} is not serving: {} failed: {reason}",
            entry.init_hook
        )));
    }

    let answered = state.dispatcher.dispatch(entry, &body).await?;
    let json = answered.to_json().map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(([(CONTENT_TYPE, "application/json")], json).into_response())
}

fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };
    let mime = value
        .to_str()
        .ok()
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json") {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType(format!(
            "unsupported content type {mime:?}, expected application/json"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use hookserve_core::ReviewError;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_content_type_check() {
        assert!(check_content_type(&HeaderMap::new()).is_ok());
        assert!(check_content_type(&headers("application/json")).is_ok());
        assert!(check_content_type(&headers("application/json; charset=utf-8")).is_ok());
        assert!(check_content_type(&headers("application/merge-patch+json")).is_ok());
        assert!(matches!(
            check_content_type(&headers("text/plain")),
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(DispatchError::Hook(HookError::Timeout(
            std::time::Duration::from_secs(1),
        )));
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_unavailable_maps_to_service_unavailable() {
        let response = ApiError::Unavailable("widgets.v1.a.example.io is not serving".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let saturated = ApiError::from(DispatchError::Hook(HookError::Saturated(4)));
        assert_eq!(saturated.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_review_error_maps_to_bad_request() {
        let err = ApiError::from(DispatchError::Review(ReviewError::MissingRequest {
            kind: "AdmissionReview",
        }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
