use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{TravelStory, User, UserSummary};

// -- JWT Claims --

/// Claims carried by access tokens. Issued by the auth handlers and checked
/// by the request authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

/// Fields are optional so that a missing field can be reported with the
/// uniform "All fields are required." message instead of a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub error: bool,
    pub user: UserSummary,
    pub access_token: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub error: bool,
    pub message: String,
    pub user: UserSummary,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
    pub message: String,
}

// -- Images --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub error: bool,
    pub message: String,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageQuery {
    pub image_url: Option<String>,
}

// -- Stories --

/// Epoch milliseconds, accepted either as a JSON number or as a numeric
/// string (the web client sends both).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EpochMillis {
    Number(serde_json::Number),
    Text(String),
}

impl EpochMillis {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = match self {
            EpochMillis::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
            EpochMillis::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub title: Option<String>,
    pub story: Option<String>,
    pub visited_location: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub visited_date: Option<EpochMillis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFavouriteRequest {
    pub is_favourite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub error: bool,
    pub message: String,
    pub story: TravelStory,
}

#[derive(Debug, Serialize)]
pub struct StoriesResponse {
    pub message: String,
    pub stories: Vec<TravelStory>,
}

/// Body for responses that carry nothing but the status flag and a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub error: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}
