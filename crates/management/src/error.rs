//! Mapping of domain errors onto HTTP responses.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mailport_core::MailportError;
use serde::Serialize;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Body of a 422 response: a summary line plus the messages per field.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

pub struct ApiError(pub MailportError);

impl From<MailportError> for ApiError {
    fn from(err: MailportError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            MailportError::Validation(errors) => {
                metrics::counter!("api.validation_errors").increment(1);
                let message = errors
                    .first_message()
                    .unwrap_or("The given data was invalid.")
                    .to_string();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ValidationErrorResponse {
                        message,
                        errors: errors.into_map(),
                    }),
                )
                    .into_response()
            }
            MailportError::NotFound { entity, id } => {
                warn!(entity, id = %id, "Resource not found");
                (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: "not_found".to_string(),
                        message: format!("{entity} not found"),
                    }),
                )
                    .into_response()
            }
            MailportError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "unauthorized".to_string(),
                    message,
                }),
            )
                .into_response(),
            other => {
                error!(error = %other, "Request failed");
                metrics::counter!("api.errors").increment(1);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal_error".to_string(),
                        message: "Internal processing error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
