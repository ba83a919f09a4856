use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json`, but a malformed body comes back as our JSON 400 instead of
/// axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
