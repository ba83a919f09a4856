//! Error type shared by every handler.
//!
//! All failures are rendered as `{"error": true, "message": "..."}`.
//! Internal failures are logged in full and reach the client only as a
//! generic message.

use axum::{
    Json,
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use travel_types::api::MessageResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    /// `message` goes to the client, `detail` only to the log.
    #[error("{message}: {detail:#}")]
    Internal {
        message: String,
        detail: anyhow::Error,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>, detail: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(detail: anyhow::Error) -> Self {
        ApiError::internal("Internal server error", detail)
    }
}

/// Oversized bodies keep their 413; every other rejection (bad syntax,
/// wrong content type, wrong field types) is a 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal { message, detail } => {
                error!("{}: {:#}", message, detail);
                message
            }
            other => other.to_string(),
        };

        (status, Json(MessageResponse::err(message))).into_response()
    }
}

/// Attach a client-facing message to a fallible internal operation.
pub trait OrInternal<T> {
    fn or_internal(self, message: &str) -> ApiResult<T>;
}

impl<T, E> OrInternal<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_internal(self, message: &str) -> ApiResult<T> {
        self.map_err(|e| ApiError::internal(message, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("Error", anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_stays_out_of_client_message() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("secret detail"));
        let err = result.or_internal("Error fetching travel stories.").unwrap_err();
        match err {
            ApiError::Internal { message, .. } => assert_eq!(message, "Error fetching travel stories."),
            other => panic!("unexpected {other:?}"),
        }
    }
}
