use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use travel_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Access token required."))?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::unauthorized("Invalid or expired token.")
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use uuid::Uuid;

    #[test]
    fn token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", chrono::Duration::hours(72), user_id, "a@b.co").unwrap();

        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.co");
    }

    #[test]
    fn wrong_secret_fails() {
        let token = create_token("secret", chrono::Duration::hours(1), Uuid::new_v4(), "a@b.co").unwrap();
        assert!(decode_token("other", &token).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let token = create_token("secret", chrono::Duration::hours(-2), Uuid::new_v4(), "a@b.co").unwrap();
        assert!(decode_token("secret", &token).is_err());
    }
}
