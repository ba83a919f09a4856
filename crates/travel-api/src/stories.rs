use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use travel_db::StoryRow;
use travel_types::api::{
    Claims, DateRangeQuery, MessageResponse, SearchQuery, StoriesResponse, StoryRequest,
    StoryResponse, UpdateFavouriteRequest,
};
use travel_types::models::TravelStory;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, OrInternal};
use crate::extract::JsonBody;
use crate::validation::{clean_locations, required};
use crate::{millis_to_datetime, with_db};

const NOT_FOUND: &str = "Travel Story not found.";
const FIELDS_REQUIRED: &str = "All fields are required.";
const FETCHED: &str = "Travel Stories fetched successfully";
const FETCH_FAILED: &str = "Error fetching travel stories.";

/// Validated body of an add or edit request.
struct StoryFields {
    title: String,
    story: String,
    visited_location: Vec<String>,
    image_url: Option<String>,
    visited_date: i64,
}

fn story_fields(req: StoryRequest) -> ApiResult<StoryFields> {
    let locations = clean_locations(req.visited_location.as_deref().unwrap_or_default());

    let (Some(title), Some(story), Some(visited_date)) = (
        required(req.title.as_deref()),
        required(req.story.as_deref()),
        req.visited_date.as_ref(),
    ) else {
        return Err(ApiError::bad_request(FIELDS_REQUIRED));
    };
    if locations.is_empty() {
        return Err(ApiError::bad_request(FIELDS_REQUIRED));
    }

    let visited_date = visited_date
        .to_datetime()
        .ok_or_else(|| ApiError::bad_request("visitedDate must be epoch milliseconds."))?;

    Ok(StoryFields {
        title: title.to_string(),
        story: story.to_string(),
        visited_location: locations,
        image_url: required(req.image_url.as_deref()).map(str::to_string),
        visited_date: visited_date.timestamp_millis(),
    })
}

/// Ids that are not UUIDs can't name a story, so they read as "not found".
fn story_id(raw: &str) -> ApiResult<String> {
    raw.parse::<Uuid>()
        .map(|id| id.to_string())
        .map_err(|_| ApiError::not_found(NOT_FOUND))
}

fn story_from_row(row: StoryRow) -> TravelStory {
    TravelStory {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt story id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id '{}' on story '{}': {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        title: row.title,
        story: row.story,
        visited_location: row.visited_location,
        is_favourite: row.is_favourite,
        image_url: row.image_url,
        visited_date: millis_to_datetime(row.visited_date),
        created_at: millis_to_datetime(row.created_at),
    }
}

fn stories_response(rows: Vec<StoryRow>, message: &str) -> Json<StoriesResponse> {
    Json(StoriesResponse {
        message: message.to_string(),
        stories: rows.into_iter().map(story_from_row).collect(),
    })
}

fn story_response(row: StoryRow, message: &str) -> Json<StoryResponse> {
    Json(StoryResponse {
        error: false,
        message: message.to_string(),
        story: story_from_row(row),
    })
}

/// POST /add-travel-story
pub async fn add_travel_story(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<StoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let fields = story_fields(req)?;
    let Some(image_url) = fields.image_url else {
        return Err(ApiError::bad_request(FIELDS_REQUIRED));
    };

    let row = StoryRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        title: fields.title,
        story: fields.story,
        visited_location: fields.visited_location,
        image_url,
        visited_date: fields.visited_date,
        is_favourite: false,
        created_at: chrono::Utc::now().timestamp_millis(),
    };

    let stored = row.clone();
    let inserted = with_db(&state, move |db| db.insert_story(&stored))
        .await
        .or_internal("Error adding travel story.")?;
    if !inserted {
        // Valid token, but the account behind it is gone.
        warn!("Token for unknown user {}", claims.sub);
        return Err(ApiError::unauthorized("User not found."));
    }

    info!("Story {} added by {}", row.id, claims.email);

    Ok((
        StatusCode::CREATED,
        story_response(row, "Travel Story added successfully"),
    ))
}

/// GET /get-all-travel-stories — the caller's own stories.
pub async fn get_all_travel_stories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.get_stories_by_user(&uid))
        .await
        .or_internal(FETCH_FAILED)?;

    Ok(stories_response(rows, FETCHED))
}

/// GET /get-all-user-travel-stories — every user's stories.
pub async fn get_all_user_travel_stories(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = with_db(&state, |db| db.get_all_stories())
        .await
        .or_internal("Error fetching all travel stories.")?;

    Ok(stories_response(rows, "All Travel Stories fetched successfully"))
}

/// GET /get-all-stories-other-users — everything the caller didn't write.
pub async fn get_all_stories_other_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.get_stories_excluding_user(&uid))
        .await
        .or_internal("Error fetching travel stories by other users.")?;

    Ok(stories_response(rows, "Travel Stories by other users fetched successfully"))
}

/// GET /get-travel-story/{id}
pub async fn get_travel_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = story_id(&id)?;
    let uid = claims.sub.to_string();
    let row = with_db(&state, move |db| db.get_story(&id, &uid))
        .await
        .or_internal("Error fetching travel story.")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(story_response(row, "Travel Story fetched successfully"))
}

/// PUT /edit-story/{id} — a missing image falls back to the placeholder.
pub async fn edit_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<StoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let fields = story_fields(req)?;
    let id = story_id(&id)?;
    let uid = claims.sub.to_string();
    let image_url = fields
        .image_url
        .unwrap_or_else(|| state.images.placeholder_url());

    let updated = with_db(&state, move |db| {
        let Some(mut row) = db.get_story(&id, &uid)? else {
            return Ok(None);
        };
        row.title = fields.title;
        row.story = fields.story;
        row.visited_location = fields.visited_location;
        row.image_url = image_url;
        row.visited_date = fields.visited_date;

        if !db.update_story(&row)? {
            // Deleted between the read and the write.
            return Ok(None);
        }
        Ok(Some(row))
    })
    .await
    .or_internal("Error updating travel story.")?
    .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(story_response(updated, "Travel Story updated successfully"))
}

/// DELETE /delete-story/{id} — also removes the story's uploaded image.
pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = story_id(&id)?;
    let uid = claims.sub.to_string();
    let removed = with_db(&state, move |db| db.delete_story(&id, &uid))
        .await
        .or_internal("Error deleting travel story.")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    info!("Story {} deleted by {}", removed.id, claims.email);

    // The placeholder is shared by every story without an image.
    if !state.images.is_placeholder(&removed.image_url) {
        match state.images.delete(&removed.image_url).await {
            Ok(true) => {}
            Ok(false) => warn!("Image for story {} was already gone: {}", removed.id, removed.image_url),
            Err(e) => error!("Failed to delete image {}: {}", removed.image_url, e),
        }
    }

    Ok(Json(MessageResponse::ok("Travel Story deleted successfully")))
}

/// PUT /update-is-favourite/{id}
pub async fn update_is_favourite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateFavouriteRequest>,
) -> ApiResult<impl IntoResponse> {
    let is_favourite = req
        .is_favourite
        .ok_or_else(|| ApiError::bad_request("isFavourite is required."))?;
    let id = story_id(&id)?;
    let uid = claims.sub.to_string();

    let row = with_db(&state, move |db| db.set_favourite(&id, &uid, is_favourite))
        .await
        .or_internal("Error updating favourite status.")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(story_response(row, "Favourite status updated successfully"))
}

/// GET /search?query=...
pub async fn search_stories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let needle = required(query.query.as_deref())
        .ok_or_else(|| ApiError::bad_request("Search query is required."))?
        .to_string();

    let uid = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.search_stories(&uid, &needle))
        .await
        .or_internal(FETCH_FAILED)?;

    Ok(stories_response(rows, FETCHED))
}

/// GET /travel-stories/filter?startDate=<ms>&endDate=<ms> — inclusive bounds.
pub async fn filter_stories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    let (Some(start), Some(end)) = (
        required(query.start_date.as_deref()),
        required(query.end_date.as_deref()),
    ) else {
        return Err(ApiError::bad_request("startDate and endDate are required."));
    };

    let (Ok(start), Ok(end)) = (start.parse::<i64>(), end.parse::<i64>()) else {
        return Err(ApiError::bad_request(
            "startDate and endDate must be epoch milliseconds.",
        ));
    };

    let uid = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.filter_stories_by_date(&uid, start, end))
        .await
        .or_internal(FETCH_FAILED)?;

    Ok(stories_response(rows, FETCHED))
}
