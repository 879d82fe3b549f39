//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use workflow::WorkflowError;

use crate::validation::ValidationIssue;

/// Body of every 500 response. Details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Ups. Algo sucedió en el servidor.";

/// API-level error type that maps to HTTP responses.
///
/// Every body has the shape `{"success": false, "error": <message>}`;
/// validation failures add `"detalles"` with one entry per invalid field.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request body failed validation.
    Validation {
        message: String,
        issues: Vec<ValidationIssue>,
    },
    /// No usable credentials.
    Unauthorized(String),
    /// Credentials were rejected.
    Forbidden(String),
    /// Order workflow error.
    Workflow(WorkflowError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, issues) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Validation { message, issues } => {
                (StatusCode::BAD_REQUEST, message, Some(issues))
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::Workflow(err) => {
                let (status, msg) = workflow_error_to_response(err);
                (status, msg, None)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
        };

        let mut body = serde_json::json!({ "success": false, "error": message });
        if let Some(issues) = issues {
            body["detalles"] = serde_json::json!(issues);
        }
        (status, Json(body)).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, String) {
    let status = match &err {
        WorkflowError::ProductNotFound(_)
        | WorkflowError::OrderNotFound(_)
        | WorkflowError::UserNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::ProductUnavailable { .. }
        | WorkflowError::InsufficientStock { .. }
        | WorkflowError::CurrencyMismatch { .. }
        | WorkflowError::MultipleSellers { .. }
        | WorkflowError::SellerMismatch { .. }
        | WorkflowError::OrderNotCancelable { .. }
        | WorkflowError::OrderNotShippable { .. }
        | WorkflowError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
        WorkflowError::NotOrderSeller { .. } => StatusCode::FORBIDDEN,
        WorkflowError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        WorkflowError::Store(store_err) => {
            tracing::error!(error = %store_err, "store failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl ApiError {
    /// Validation failure for a body that could not be decoded at all.
    pub fn from_json_rejection(message: &str, rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: message.to_string(),
            issues: vec![ValidationIssue {
                path: String::new(),
                message: rejection.body_text(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, UserId};
    use store::StoreError;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_workflow_status_mapping() {
        let cases = [
            (
                WorkflowError::OrderNotFound(OrderId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                WorkflowError::MultipleSellers {
                    sellers: vec![UserId::new(), UserId::new()],
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                WorkflowError::NotOrderSeller {
                    order_id: OrderId::new(),
                    user: UserId::new(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                WorkflowError::ConcurrencyConflict(OrderId::new()),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
            let body = body_of(response).await;
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_store_errors_are_hidden() {
        let err = WorkflowError::Store(StoreError::Unavailable("db down".to_string()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_validation_body_has_details() {
        let response = ApiError::Validation {
            message: "Datos inválidos".to_string(),
            issues: vec![ValidationIssue {
                path: "items".to_string(),
                message: "Requerido".to_string(),
            }],
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["detalles"][0]["path"], "items");
    }
}
