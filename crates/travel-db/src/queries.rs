use crate::Database;
use crate::models::{StoryRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};

const STORY_COLUMNS: &str =
    "id, user_id, title, story, visited_location, image_url, visited_date, is_favourite, created_at";

/// Favourites first, then insertion order.
const STORY_ORDER: &str = "ORDER BY is_favourite DESC, rowid ASC";

impl Database {
    // -- Users --

    /// Inserts a user. Returns `false` if the email is already taken.
    pub fn create_user(&self, user: &UserRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, full_name, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![user.id, user.full_name, user.email, user.password, user.created_at],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Stories --

    /// Inserts a story. Returns `false` if the owner does not exist.
    pub fn insert_story(&self, story: &StoryRow) -> Result<bool> {
        let locations = serde_json::to_string(&story.visited_location)?;
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO stories (id, user_id, title, story, visited_location, image_url, visited_date, is_favourite, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    story.id,
                    story.user_id,
                    story.title,
                    story.story,
                    locations,
                    story.image_url,
                    story.visited_date,
                    story.is_favourite,
                    story.created_at,
                ],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Fetch a story only if it belongs to `user_id`.
    pub fn get_story(&self, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| query_owned_story(conn, id, user_id))
    }

    pub fn get_stories_by_user(&self, user_id: &str) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| {
            query_stories(conn, &format!("WHERE user_id = ?1 {STORY_ORDER}"), rusqlite::params![user_id])
        })
    }

    pub fn get_all_stories(&self) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| query_stories(conn, STORY_ORDER, rusqlite::params![]))
    }

    pub fn get_stories_excluding_user(&self, user_id: &str) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| {
            query_stories(conn, &format!("WHERE user_id != ?1 {STORY_ORDER}"), rusqlite::params![user_id])
        })
    }

    /// Stories of `user_id` whose title, narrative or any visited location
    /// contains `needle`, ignoring case. The needle is a literal, not a pattern.
    pub fn search_stories(&self, user_id: &str, needle: &str) -> Result<Vec<StoryRow>> {
        let needle = needle.to_lowercase();
        let stories = self.get_stories_by_user(user_id)?;

        // Done in Rust rather than with LIKE, which only folds ASCII case.
        Ok(stories
            .into_iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.story.to_lowercase().contains(&needle)
                    || s.visited_location.iter().any(|l| l.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Stories of `user_id` visited within `[start, end]` (unix millis, inclusive).
    pub fn filter_stories_by_date(&self, user_id: &str, start: i64, end: i64) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| {
            query_stories(
                conn,
                &format!("WHERE user_id = ?1 AND visited_date >= ?2 AND visited_date <= ?3 {STORY_ORDER}"),
                rusqlite::params![user_id, start, end],
            )
        })
    }

    /// Overwrites the editable fields of an owned story.
    /// Returns `false` if no story with that id belongs to the owner.
    pub fn update_story(&self, story: &StoryRow) -> Result<bool> {
        let locations = serde_json::to_string(&story.visited_location)?;
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE stories
                 SET title = ?3, story = ?4, visited_location = ?5, image_url = ?6, visited_date = ?7
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![
                    story.id,
                    story.user_id,
                    story.title,
                    story.story,
                    locations,
                    story.image_url,
                    story.visited_date,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Sets the favourite flag and returns the updated story, or `None` if
    /// the owner has no such story.
    pub fn set_favourite(&self, id: &str, user_id: &str, is_favourite: bool) -> Result<Option<StoryRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE stories SET is_favourite = ?3 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, is_favourite],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_owned_story(conn, id, user_id)
        })
    }

    /// Deletes an owned story and hands back the removed row so the caller can
    /// clean up its image.
    pub fn delete_story(&self, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(row) = query_owned_story(&tx, id, user_id)? else {
                return Ok(None);
            };
            tx.execute(
                "DELETE FROM stories WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            tx.commit()?;
            Ok(Some(row))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, full_name, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_owned_story(conn: &Connection, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1 AND user_id = ?2"
    ))?;
    let row = stmt.query_row([id, user_id], map_story).optional()?;
    Ok(row)
}

fn query_stories(conn: &Connection, tail: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<StoryRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {STORY_COLUMNS} FROM stories {tail}"))?;
    let rows = stmt
        .query_map(params, map_story)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    let locations: String = row.get(4)?;
    let visited_location = serde_json::from_str(&locations).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        story: row.get(3)?,
        visited_location,
        image_url: row.get(5)?,
        visited_date: row.get(6)?,
        is_favourite: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(db: &Database, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let created = db
            .create_user(&UserRow {
                id: id.clone(),
                full_name: "Test User".into(),
                email: email.into(),
                password: "hash".into(),
                created_at: 0,
            })
            .unwrap();
        assert!(created);
        id
    }

    fn story(db: &Database, user_id: &str, title: &str, visited_date: i64) -> StoryRow {
        let row = StoryRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            story: format!("Notes about {title}"),
            visited_location: vec!["Somewhere".into()],
            image_url: "http://localhost:8000/uploads/x.png".into(),
            visited_date,
            is_favourite: false,
            created_at: 0,
        };
        assert!(db.insert_story(&row).unwrap());
        row
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "a@example.com");

        let again = db
            .create_user(&UserRow {
                id: Uuid::new_v4().to_string(),
                full_name: "Other".into(),
                email: "a@example.com".into(),
                password: "hash".into(),
                created_at: 0,
            })
            .unwrap();
        assert!(!again);
    }

    #[test]
    fn user_lookup_by_email_and_id() {
        let db = Database::open_in_memory().unwrap();
        let id = user(&db, "a@example.com");

        let by_email = db.get_user_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert!(db.get_user_by_id(&id).unwrap().is_some());
        assert!(db.get_user_by_email("missing@example.com").unwrap().is_none());
    }

    #[test]
    fn story_for_unknown_owner_is_not_inserted() {
        let db = Database::open_in_memory().unwrap();
        let row = StoryRow {
            id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            title: "Orphan".into(),
            story: "No owner".into(),
            visited_location: vec!["Nowhere".into()],
            image_url: "x.png".into(),
            visited_date: 0,
            is_favourite: false,
            created_at: 0,
        };

        assert!(!db.insert_story(&row).unwrap());
        assert!(db.get_all_stories().unwrap().is_empty());
    }

    #[test]
    fn stories_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        let s = story(&db, &alice, "Lisbon", 10);

        assert!(db.get_story(&s.id, &alice).unwrap().is_some());
        assert!(db.get_story(&s.id, &bob).unwrap().is_none());
        assert!(db.set_favourite(&s.id, &bob, true).unwrap().is_none());
        assert!(db.delete_story(&s.id, &bob).unwrap().is_none());

        let mut edited = s.clone();
        edited.user_id = bob.clone();
        edited.title = "Hijacked".into();
        assert!(!db.update_story(&edited).unwrap());

        assert_eq!(db.get_stories_by_user(&alice).unwrap().len(), 1);
        assert!(db.get_stories_by_user(&bob).unwrap().is_empty());
        assert_eq!(db.get_stories_excluding_user(&bob).unwrap().len(), 1);
        assert!(db.get_stories_excluding_user(&alice).unwrap().is_empty());
        assert_eq!(db.get_all_stories().unwrap().len(), 1);
    }

    #[test]
    fn favourites_sort_first_then_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let first = story(&db, &alice, "First", 1);
        let second = story(&db, &alice, "Second", 2);
        let third = story(&db, &alice, "Third", 3);

        let fav = db.set_favourite(&third.id, &alice, true).unwrap().unwrap();
        assert!(fav.is_favourite);

        let ids: Vec<String> = db
            .get_stories_by_user(&alice)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![third.id, first.id, second.id]);
    }

    #[test]
    fn update_overwrites_editable_fields() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let mut s = story(&db, &alice, "Rome", 5);

        s.title = "Roma".into();
        s.visited_location = vec!["Italy".into(), "Lazio".into()];
        s.visited_date = 99;
        assert!(db.update_story(&s).unwrap());

        let stored = db.get_story(&s.id, &alice).unwrap().unwrap();
        assert_eq!(stored.title, "Roma");
        assert_eq!(stored.visited_location, vec!["Italy", "Lazio"]);
        assert_eq!(stored.visited_date, 99);
    }

    #[test]
    fn delete_returns_removed_row() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let s = story(&db, &alice, "Oslo", 5);

        let removed = db.delete_story(&s.id, &alice).unwrap().unwrap();
        assert_eq!(removed.image_url, s.image_url);
        assert!(db.get_story(&s.id, &alice).unwrap().is_none());
        assert!(db.delete_story(&s.id, &alice).unwrap().is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        story(&db, &alice, "Summer in ÉVORA", 1);
        let mut tagged = story(&db, &alice, "Hike", 2);
        tagged.visited_location = vec!["Patagonia".into()];
        db.update_story(&tagged).unwrap();
        story(&db, &alice, "100% fun", 3);
        story(&db, &bob, "Évora again", 4);

        let hits = db.search_stories(&alice, "évora").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Summer in ÉVORA");

        let hits = db.search_stories(&alice, "PATAGONIA").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, tagged.id);

        // Pattern characters match literally.
        let hits = db.search_stories(&alice, "0%").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(db.search_stories(&alice, "%").unwrap().len() == 1);
        assert!(db.search_stories(&alice, "nowhere").unwrap().is_empty());
    }

    #[test]
    fn date_filter_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        story(&db, &alice, "Before", 99);
        story(&db, &alice, "Start", 100);
        story(&db, &alice, "End", 200);
        story(&db, &alice, "After", 201);

        let titles: Vec<String> = db
            .filter_stories_by_date(&alice, 100, 200)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Start", "End"]);
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("travel.db");

        let alice = {
            let db = Database::open(&path).unwrap();
            let alice = user(&db, "alice@example.com");
            story(&db, &alice, "Persisted", 1);
            alice
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_stories_by_user(&alice).unwrap().len(), 1);
    }
}
