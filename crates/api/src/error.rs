//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path segment or request body.
    BadRequest(String),
    /// Error raised by a checkout, cart or order operation.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };
        metrics::counter!("http_errors_total", "status" => status.as_str().to_string())
            .increment(1);

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::InvalidState(_) | DomainError::OutOfStock { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use store::StoreError;

    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_status_codes() {
        assert_eq!(
            status_of(DomainError::NotFound {
                entity: "order",
                id: "x".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::InvalidState("cart is empty".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::OutOfStock {
                product_name: "Espresso".into(),
                available: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Validation("quantity must be at least 1".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Store(StoreError::LockTimeout("product A".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request() {
        let response = ApiError::BadRequest("invalid user id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
