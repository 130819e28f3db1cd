//! API error handling utilities.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::models::UserError;
use crate::services::{ApplyError, BatchError, CatalogError, FlowError, RunError};
use crate::storage::StorageError;

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub user_errors: Vec<UserError>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            user_errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log the underlying failure and hide it behind a 500.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16(),
        });
        if !self.user_errors.is_empty() {
            body["userErrors"] = json!(self.user_errors);
        }

        (self.status, axum::Json(body)).into_response()
    }
}

/// Malformed or mistyped request bodies are client errors, reported in the
/// usual error envelope instead of axum's plain-text rejection.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound {
                entity_type,
                entity_id,
            } => Self::not_found(format!("{entity_type} not found: {entity_id}")),
            StorageError::InvalidKey(key) => Self::bad_request(format!("Invalid key: {key}")),
            other => Self::internal("Storage error", other),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotConfigured(_) => Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            other => Self::internal("Failed to fetch products", other),
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<ApplyError> for ApiError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::UserErrors(user_errors) => Self {
                status: StatusCode::BAD_REQUEST,
                message: "Shopify rejected the update".to_string(),
                user_errors,
            },
            ApplyError::GenerationFailed | ApplyError::NothingToApply => {
                Self::bad_request(err.to_string())
            }
            ApplyError::Catalog(CatalogError::NotConfigured(what)) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                CatalogError::NotConfigured(what).to_string(),
            ),
            ApplyError::Catalog(e) => Self::internal("Failed to update product", e),
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation(message) => Self::bad_request(message),
            FlowError::NotFound(_) | FlowError::TemplateNotFound(_) => {
                Self::not_found(err.to_string())
            }
            FlowError::Storage(e) => e.into(),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::ProductNotInRun { .. } => Self::not_found(err.to_string()),
            RunError::Busy(_) | RunError::AlreadyApplied(_) => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            RunError::NotGenerated(_) => Self::bad_request(err.to_string()),
            RunError::Task(e) => Self::internal("Generation task failed", e),
            RunError::Flow(e) => e.into(),
            RunError::Batch(e) => e.into(),
            RunError::Apply(e) => e.into(),
            RunError::Storage(e) => e.into(),
        }
    }
}
