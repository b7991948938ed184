//! Request extractors whose rejections are reported through [`ApiError`].
//!
//! A path id that does not parse cannot name a row, so it becomes a 404.
//! A body that does not deserialize becomes a 422 on the `body` field.

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use mailport_core::MailportError;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;

pub const BODY_FIELD: &str = "body";

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ApiError))]
pub struct Form<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        let reason = rejection.body_text();
        debug!(reason = %reason, "Path parameter rejected");
        Self(MailportError::not_found("resource", reason))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MailportError::validation(BODY_FIELD, rejection.body_text()))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self(MailportError::validation(BODY_FIELD, rejection.body_text()))
    }
}
