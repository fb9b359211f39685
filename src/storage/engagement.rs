use rusqlite::{params, Connection};

use super::{exists, insert_notification, new_id, posts, Storage, StorageError, StorageResult};
use crate::db::models::{Engagement, NewNotification, Post};
use crate::domain::{NotificationKind, ReputationLevel};

/// The two post-engagement tables. Both are (post, user) join rows with a
/// denormalized counter on `posts`.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Upvote,
    Save,
}

impl Kind {
    fn table(self) -> &'static str {
        match self {
            Kind::Upvote => "upvotes",
            Kind::Save => "saves",
        }
    }

    fn counter(self) -> &'static str {
        match self {
            Kind::Upvote => "upvotes_count",
            Kind::Save => "saves_count",
        }
    }
}

fn has(conn: &Connection, kind: Kind, post_id: &str, user_id: &str) -> StorageResult<bool> {
    exists(
        conn,
        &format!(
            "SELECT COUNT(*) > 0 FROM {} WHERE post_id = ?1 AND user_id = ?2",
            kind.table()
        ),
        params![post_id, user_id],
    )
}

/// Insert the join row and bump the post counter. `None` when the pair
/// already existed; the unique constraint decides, not a prior read.
fn insert(
    conn: &Connection,
    kind: Kind,
    post: &Post,
    user_id: &str,
) -> StorageResult<Option<Engagement>> {
    let id = new_id();
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {} (id, post_id, user_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(post_id, user_id) DO NOTHING",
            kind.table()
        ),
        params![id, post.id, user_id],
    )?;
    if inserted == 0 {
        return Ok(None);
    }

    conn.execute(
        &format!(
            "UPDATE posts SET {counter} = {counter} + 1 WHERE id = ?1",
            counter = kind.counter()
        ),
        params![post.id],
    )?;

    let row = conn.query_row(
        &format!(
            "SELECT id, post_id, user_id, created_at FROM {} WHERE id = ?1",
            kind.table()
        ),
        params![id],
        Engagement::from_row,
    )?;
    Ok(Some(row))
}

/// Remove the join row and decrement the counter (floored at zero). Counters
/// are untouched when there was no row.
fn remove(conn: &Connection, kind: Kind, post_id: &str, user_id: &str) -> StorageResult<bool> {
    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE post_id = ?1 AND user_id = ?2",
            kind.table()
        ),
        params![post_id, user_id],
    )?;
    if removed == 0 {
        return Ok(false);
    }

    conn.execute(
        &format!(
            "UPDATE posts SET {counter} = MAX({counter} - 1, 0) WHERE id = ?1",
            counter = kind.counter()
        ),
        params![post_id],
    )?;
    Ok(true)
}

fn reputation(conn: &Connection, user_id: &str) -> StorageResult<i64> {
    Ok(conn.query_row(
        "SELECT reputation_score FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?)
}

impl Storage {
    pub fn has_upvoted(&self, post_id: &str, user_id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        has(&conn, Kind::Upvote, post_id, user_id)
    }

    pub fn has_saved(&self, post_id: &str, user_id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        has(&conn, Kind::Save, post_id, user_id)
    }

    /// Upvote a post: post counter +1, author reputation +1, and an `upvote`
    /// notification for the author unless they upvoted themselves. Crossing a
    /// reputation level also emits `level_up`. Returns `None` on a repeat.
    pub fn create_upvote(&self, post_id: &str, user_id: &str) -> StorageResult<Option<Engagement>> {
        self.write(|tx| {
            let post = posts::post_by_id(tx, post_id)?.ok_or(StorageError::NotFound("Post"))?;
            let Some(upvote) = insert(tx, Kind::Upvote, &post, user_id)? else {
                return Ok(None);
            };

            let before = ReputationLevel::from_score(reputation(tx, &post.author_id)?);
            tx.execute(
                "UPDATE users SET reputation_score = reputation_score + 1 WHERE id = ?1",
                params![post.author_id],
            )?;
            let after = ReputationLevel::from_score(reputation(tx, &post.author_id)?);

            if post.author_id != user_id {
                let (title, message) = NotificationKind::Upvote.default_text();
                insert_notification(
                    tx,
                    &NewNotification {
                        user_id: post.author_id.clone(),
                        kind: NotificationKind::Upvote.to_string(),
                        title,
                        message,
                        from_user_id: Some(user_id.to_string()),
                        post_id: Some(post.id.clone()),
                    },
                )?;
            }

            if after > before {
                insert_notification(
                    tx,
                    &NewNotification {
                        user_id: post.author_id.clone(),
                        kind: NotificationKind::LevelUp.to_string(),
                        title: "Level Up".into(),
                        message: format!("You reached {}", after),
                        from_user_id: None,
                        post_id: None,
                    },
                )?;
            }

            Ok(Some(upvote))
        })
    }

    /// Returns false when the user had not upvoted the post.
    pub fn delete_upvote(&self, post_id: &str, user_id: &str) -> StorageResult<bool> {
        self.write(|tx| {
            let post = posts::post_by_id(tx, post_id)?.ok_or(StorageError::NotFound("Post"))?;
            if !remove(tx, Kind::Upvote, post_id, user_id)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE users SET reputation_score = MAX(reputation_score - 1, 0) WHERE id = ?1",
                params![post.author_id],
            )?;
            Ok(true)
        })
    }

    pub fn create_save(&self, post_id: &str, user_id: &str) -> StorageResult<Option<Engagement>> {
        self.write(|tx| {
            let post = posts::post_by_id(tx, post_id)?.ok_or(StorageError::NotFound("Post"))?;
            insert(tx, Kind::Save, &post, user_id)
        })
    }

    pub fn delete_save(&self, post_id: &str, user_id: &str) -> StorageResult<bool> {
        self.write(|tx| {
            if posts::post_by_id(tx, post_id)?.is_none() {
                return Err(StorageError::NotFound("Post"));
            }
            remove(tx, Kind::Save, post_id, user_id)
        })
    }

    /// Posts the user saved, newest post first.
    pub fn saved_posts(&self, user_id: &str) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        posts::query_posts(
            &conn,
            "SELECT p.id, p.title, p.content, p.category, p.tags, p.cover_image_url,
                    p.author_id, p.upvotes_count, p.saves_count, p.comments_count, p.created_at
             FROM posts p
             JOIN saves s ON s.post_id = p.id
             WHERE s.user_id = ?1
             ORDER BY p.created_at DESC, p.rowid DESC",
            params![user_id],
        )
    }
}
