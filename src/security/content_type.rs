//! Content-type precondition for state-changing requests.

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// The single accepted body format.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/json";

/// Methods that carry a body to act on.
pub fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// True when the declared media type is JSON. Parameters such as
/// `charset` are ignored.
pub fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(ACCEPTED_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Middleware rejecting state-changing requests without a JSON body type.
pub async fn require_json(request: Request<Body>, next: Next) -> Response {
    if is_state_changing(request.method()) && !declares_json(request.headers()) {
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected non-JSON request body"
        );
        return ApiError::UnsupportedMediaType.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_json_variants() {
        assert!(declares_json(&with_type("application/json")));
        assert!(declares_json(&with_type("application/json; charset=utf-8")));
        assert!(declares_json(&with_type("Application/JSON")));
        assert!(!declares_json(&with_type("text/plain")));
        assert!(!declares_json(&with_type("application/jsonp")));
        assert!(!declares_json(&HeaderMap::new()));
    }

    #[test]
    fn test_only_body_methods_are_checked() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::PUT));
        assert!(is_state_changing(&Method::PATCH));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::DELETE));
    }
}
