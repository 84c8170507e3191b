//! Consistent JSON error responses.
//!
//! Every failure body is `{"error": <code>, "message": <detail>}`. Domain
//! errors map onto status codes here and nowhere else.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockdesk_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::DependencyExists(msg) => {
            json_error(StatusCode::CONFLICT, "dependency_exists", msg)
        }
        err @ DomainError::InvalidState { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", err.to_string())
        }
        err @ DomainError::InvalidTransition { .. } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_transition",
            err.to_string(),
        ),
        // Do not leak storage details to clients.
        DomainError::Storage(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            "internal storage failure",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(err: DomainError) -> StatusCode {
        domain_error_to_response(err).status()
    }

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        assert_eq!(
            status_for(DomainError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DomainError::invalid_id("nope")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DomainError::not_found("product")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(DomainError::conflict("sku taken")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(DomainError::dependency_exists("stock on hand")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(DomainError::invalid_state("shipped", "delete order")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(DomainError::invalid_transition("pending", "delivered")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(DomainError::storage("connection refused")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
