//! Database row types — these map directly to SQLite rows.
//! Distinct from travel-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct StoryRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub story: String,
    pub visited_location: Vec<String>,
    pub image_url: String,
    pub visited_date: i64,
    pub is_favourite: bool,
    pub created_at: i64,
}
