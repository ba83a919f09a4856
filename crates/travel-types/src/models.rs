use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account as exposed over the API. The password hash never
/// leaves the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(rename = "createdOn")]
    pub created_at: DateTime<Utc>,
}

/// Name and email only, returned alongside freshly issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelStory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub story: String,
    pub visited_location: Vec<String>,
    pub is_favourite: bool,
    pub user_id: Uuid,
    pub image_url: String,
    pub visited_date: DateTime<Utc>,
    #[serde(rename = "createdOn")]
    pub created_at: DateTime<Utc>,
}
