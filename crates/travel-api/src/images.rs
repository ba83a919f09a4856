use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use travel_types::api::{DeleteImageQuery, ImageUploadResponse, MessageResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, OrInternal};
use crate::validation::required;

/// Multipart form field carrying the file.
const IMAGE_FIELD: &str = "image";

/// POST /image-upload — multipart form with an `image` file field.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            break;
        }

        let filename = state
            .images
            .save(original_name.as_deref(), &data)
            .await
            .or_internal("Error uploading image")?;

        return Ok(Json(ImageUploadResponse {
            error: false,
            message: "Image uploaded successfully".into(),
            image_url: state.images.url_for(&filename),
        }));
    }

    Err(ApiError::bad_request("No image uploaded"))
}

/// DELETE /delete-image?imageUrl=...
pub async fn delete_image(
    State(state): State<AppState>,
    Query(query): Query<DeleteImageQuery>,
) -> ApiResult<impl IntoResponse> {
    let image_url =
        required(query.image_url.as_deref()).ok_or_else(|| ApiError::bad_request("No image provided"))?;

    let deleted = state
        .images
        .delete(image_url)
        .await
        .or_internal("Error deleting image")?;

    if !deleted {
        return Err(ApiError::not_found("Image not found"));
    }

    Ok((StatusCode::OK, Json(MessageResponse::ok("Image deleted successfully"))))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    warn!("Malformed multipart upload: {}", e);
    ApiError::bad_request(e.body_text())
}
