use rusqlite::{params, Connection, ErrorCode};

use super::{new_id, optional, posts, Storage, StorageError, StorageResult};
use crate::db::models::{NewUser, User, UserUpdate};

pub(super) fn user_by_id(conn: &Connection, id: &str) -> StorageResult<Option<User>> {
    optional(conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    ))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// Engagement and graph rows owned by a user, unwound before the user row goes.
const DELETE_USER_STATEMENTS: &[&str] = &[
    "UPDATE users SET reputation_score = MAX(reputation_score - (
         SELECT COUNT(*) FROM upvotes u JOIN posts p ON p.id = u.post_id
         WHERE u.user_id = ?1 AND p.author_id = users.id), 0)
     WHERE id IN (SELECT p.author_id FROM upvotes u JOIN posts p ON p.id = u.post_id
                  WHERE u.user_id = ?1)",
    "UPDATE posts SET upvotes_count = MAX(upvotes_count - 1, 0)
     WHERE id IN (SELECT post_id FROM upvotes WHERE user_id = ?1)",
    "DELETE FROM upvotes WHERE user_id = ?1",
    "UPDATE posts SET saves_count = MAX(saves_count - 1, 0)
     WHERE id IN (SELECT post_id FROM saves WHERE user_id = ?1)",
    "DELETE FROM saves WHERE user_id = ?1",
    "UPDATE users SET followers_count = MAX(followers_count - 1, 0)
     WHERE id IN (SELECT following_id FROM followers WHERE follower_id = ?1)",
    "UPDATE users SET following_count = MAX(following_count - 1, 0)
     WHERE id IN (SELECT follower_id FROM followers WHERE following_id = ?1)",
    "DELETE FROM followers WHERE follower_id = ?1 OR following_id = ?1",
    "UPDATE posts SET comments_count = MAX(comments_count - (
         SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id AND c.author_id = ?1), 0)
     WHERE id IN (SELECT post_id FROM comments WHERE author_id = ?1)",
    "DELETE FROM comments WHERE author_id = ?1",
    "DELETE FROM reports WHERE reporter_id = ?1",
    "DELETE FROM notifications WHERE user_id = ?1 OR from_user_id = ?1",
    "DELETE FROM sessions WHERE user_id = ?1",
];

impl Storage {
    pub fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        user_by_id(&conn, id)
    }

    /// Email lookup is case-insensitive (the column is `COLLATE NOCASE`).
    pub fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
            params![email],
            User::from_row,
        ))
    }

    pub fn create_user(&self, new_user: NewUser) -> StorageResult<User> {
        let conn = self.conn()?;
        let id = new_id();

        conn.execute(
            "INSERT INTO users (id, email, password_hash, name) VALUES (?1, ?2, ?3, ?4)",
            params![id, new_user.email, new_user.password_hash, new_user.name],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict("Email already in use".into())
            } else {
                e.into()
            }
        })?;

        user_by_id(&conn, &id)?.ok_or(StorageError::NotFound("User"))
    }

    /// Apply the provided profile fields; absent fields keep their value.
    pub fn update_user(&self, id: &str, update: UserUpdate) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET
                name = COALESCE(?2, name),
                bio = COALESCE(?3, bio),
                expertise = COALESCE(?4, expertise),
                profile_pic_url = COALESCE(?5, profile_pic_url)
             WHERE id = ?1",
            params![
                id,
                update.name,
                update.bio,
                update.expertise,
                update.profile_pic_url
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        user_by_id(&conn, id)
    }

    /// Remove a user and everything they own, keeping other users' counters
    /// consistent. Returns false when no such user exists.
    pub fn delete_user(&self, id: &str) -> StorageResult<bool> {
        self.write(|tx| {
            if user_by_id(tx, id)?.is_none() {
                return Ok(false);
            }

            for sql in DELETE_USER_STATEMENTS {
                tx.execute(sql, params![id])?;
            }

            let post_ids: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM posts WHERE author_id = ?1")?;
                let ids = stmt
                    .query_map(params![id], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };
            for post_id in post_ids {
                posts::delete_post_in(tx, &post_id)?;
            }

            tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            tracing::info!(user_id = %id, "Deleted user");
            Ok(true)
        })
    }
}
