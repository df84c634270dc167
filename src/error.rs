//! API error taxonomy and its translation to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input field.
    #[error("invalid value for {field}: {message}")]
    Value { field: String, message: String },

    /// Anonymous caller on a protected action, or a non-admin on an admin one.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate value for a unique field.
    #[error("conflict on {field}: {message}")]
    Conflict { field: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn value(field: &str, message: impl Into<String>) -> Self {
        ApiError::Value {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(resource.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Value { .. } => StatusCode::BAD_REQUEST,
            ApiError::Permission(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Value { .. } => "value:invalid",
            ApiError::Permission(_) => "permission:forbidden",
            ApiError::NotFound(_) => "value:notfound",
            ApiError::Conflict { .. } => "register:failed",
            ApiError::Internal(_) => "internal:error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        ApiError::Internal("data store unavailable".to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::value("body", rejection.body_text())
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (data, message) = match &self {
            ApiError::Value { field, message } | ApiError::Conflict { field, message } => {
                (field.clone(), message.clone())
            }
            ApiError::Permission(message) => (String::new(), message.clone()),
            ApiError::NotFound(resource) => (resource.clone(), format!("{resource} not found")),
            ApiError::Internal(message) => (String::new(), message.clone()),
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            data,
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
