use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            full_name   TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        -- visited_location holds a JSON array of labels.
        -- visited_date and created_at are unix milliseconds.
        CREATE TABLE IF NOT EXISTS stories (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL REFERENCES users(id),
            title             TEXT NOT NULL,
            story             TEXT NOT NULL,
            visited_location  TEXT NOT NULL DEFAULT '[]',
            image_url         TEXT NOT NULL,
            visited_date      INTEGER NOT NULL,
            is_favourite      INTEGER NOT NULL DEFAULT 0,
            created_at        INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_stories_user
            ON stories(user_id, is_favourite);

        CREATE INDEX IF NOT EXISTS idx_stories_visited
            ON stories(user_id, visited_date);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
