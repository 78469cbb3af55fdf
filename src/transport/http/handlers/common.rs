use crate::app::marketplace::ServiceError;
use crate::domain::Pagination;
use crate::transport::http::types::ApiResponse;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::any::Any;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::ListingNotFound => StatusCode::NOT_FOUND,
            ServiceError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(ApiResponse::failure(self.to_string(), self.details()))).into_response()
    }
}

/// Success envelope carrying `data`, with an optional message and pagination block.
pub fn success_response<T: Serialize>(
    status: StatusCode,
    data: &T,
    message: Option<&str>,
    pagination: Option<Pagination>,
) -> Response {
    let data = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            return internal_error();
        }
    };
    let mut body = ApiResponse::ok(Some(data));
    if let Some(message) = message {
        body = body.with_message(message);
    }
    if let Some(pagination) = pagination {
        body = body.with_pagination(pagination);
    }
    (status, Json(body)).into_response()
}

/// Success envelope with only a message.
pub fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::ok(None).with_message(message))).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failure("Internal server error", None)),
    )
        .into_response()
}

/// Converts a handler panic into the standard 500 envelope.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %detail, "handler panicked");
    internal_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            ServiceError::ListingNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::SellerMismatch.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        let store = ServiceError::Store {
            action: "Failed to fetch listings",
            source: StoreError::Decode("bad row".to_string()),
        };
        assert_eq!(store.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn panics_become_internal_errors() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
