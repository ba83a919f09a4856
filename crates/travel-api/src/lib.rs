pub mod auth;
pub mod error;
pub mod extract;
pub mod images;
pub mod middleware;
pub mod storage;
pub mod stories;
pub mod users;
pub mod validation;

use std::path::PathBuf;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use travel_db::Database;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Assemble the full HTTP surface. `frontend_dir`, when given, is served for
/// every path no route claims.
pub fn build_router(state: AppState, frontend_dir: Option<PathBuf>) -> Router {
    let public_routes = Router::new()
        .route("/create-account", post(auth::create_account))
        .route("/login", post(auth::login))
        .route("/image-upload", post(images::upload_image))
        .route("/delete-image", delete(images::delete_image))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/get-user", get(users::get_user))
        .route("/add-travel-story", post(stories::add_travel_story))
        .route("/get-all-travel-stories", get(stories::get_all_travel_stories))
        .route("/get-all-user-travel-stories", get(stories::get_all_user_travel_stories))
        .route("/get-all-stories-other-users", get(stories::get_all_stories_other_users))
        .route("/get-travel-story/{id}", get(stories::get_travel_story))
        .route("/edit-story/{id}", put(stories::edit_story))
        .route("/delete-story/{id}", delete(stories::delete_story))
        .route("/update-is-favourite/{id}", put(stories::update_is_favourite))
        .route("/search", get(stories::search_stories))
        .route("/travel-stories/filter", get(stories::filter_stories))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let uploads = state.images.dir().to_path_buf();
    let mut app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&uploads))
        .nest_service("/assets", ServeDir::new(&uploads));

    if let Some(dir) = frontend_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db)).await?
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        warn!("Timestamp out of range: {}", millis);
        DateTime::default()
    })
}
