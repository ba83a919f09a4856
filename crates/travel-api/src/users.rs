use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::warn;

use travel_db::UserRow;
use travel_types::api::{Claims, UserResponse};
use travel_types::models::User;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, OrInternal};
use crate::{millis_to_datetime, with_db};

/// GET /get-user — profile of the token's owner.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let row = with_db(&state, move |db| db.get_user_by_id(&uid))
        .await
        .or_internal("Error fetching user.")?;

    // A valid token for an account that no longer exists.
    let Some(row) = row else {
        warn!("Token for unknown user {}", claims.sub);
        return Err(ApiError::unauthorized("User not found."));
    };

    Ok(Json(UserResponse {
        user: user_from_row(row, &claims),
        message: String::new(),
    }))
}

fn user_from_row(row: UserRow, claims: &Claims) -> User {
    User {
        id: claims.sub,
        full_name: row.full_name,
        email: row.email,
        created_at: millis_to_datetime(row.created_at),
    }
}
