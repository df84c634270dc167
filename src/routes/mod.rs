/**
 * Routes Module
 * Request handlers, one module per resource
 */

pub mod auth;
pub mod blog;
pub mod comment;
pub mod health;
pub mod user;

use serde::{Deserialize, Serialize};

/// Body returned by delete endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: String,
}

/// Trimmed `value`, or a value error naming `field` when it is blank.
pub(crate) fn required(
    field: &str,
    value: &str,
    message: &str,
) -> crate::error::ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ApiError::value(field, message));
    }
    Ok(trimmed.to_string())
}

/// Rejects `value` when it has more than `max` characters.
pub(crate) fn within_limit(
    field: &str,
    value: String,
    max: usize,
) -> crate::error::ApiResult<String> {
    if value.chars().count() > max {
        return Err(crate::error::ApiError::value(
            field,
            format!("{field} cannot exceed {max} characters"),
        ));
    }
    Ok(value)
}
