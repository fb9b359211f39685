use rusqlite::params;

use super::{exists, insert_notification, new_id, users, Storage, StorageError, StorageResult};
use crate::db::models::{Follow, NewNotification, User};
use crate::domain::NotificationKind;

impl Storage {
    pub fn is_following(&self, follower_id: &str, following_id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        exists(
            &conn,
            "SELECT COUNT(*) > 0 FROM followers WHERE follower_id = ?1 AND following_id = ?2",
            params![follower_id, following_id],
        )
    }

    /// Create the edge, bump both users' counters and notify the followee.
    /// Returns `None` when the edge already existed.
    pub fn create_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> StorageResult<Option<Follow>> {
        if follower_id == following_id {
            return Err(StorageError::Conflict("Cannot follow yourself".into()));
        }

        self.write(|tx| {
            if users::user_by_id(tx, following_id)?.is_none() {
                return Err(StorageError::NotFound("User"));
            }

            let id = new_id();
            let inserted = tx.execute(
                "INSERT INTO followers (id, follower_id, following_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(follower_id, following_id) DO NOTHING",
                params![id, follower_id, following_id],
            )?;
            if inserted == 0 {
                return Ok(None);
            }

            tx.execute(
                "UPDATE users SET following_count = following_count + 1 WHERE id = ?1",
                params![follower_id],
            )?;
            tx.execute(
                "UPDATE users SET followers_count = followers_count + 1 WHERE id = ?1",
                params![following_id],
            )?;

            let (title, message) = NotificationKind::Follow.default_text();
            insert_notification(
                tx,
                &NewNotification {
                    user_id: following_id.to_string(),
                    kind: NotificationKind::Follow.to_string(),
                    title,
                    message,
                    from_user_id: Some(follower_id.to_string()),
                    post_id: None,
                },
            )?;

            let follow = tx.query_row(
                "SELECT id, follower_id, following_id, created_at FROM followers WHERE id = ?1",
                params![id],
                Follow::from_row,
            )?;
            Ok(Some(follow))
        })
    }

    /// Returns false when there was no such edge.
    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> StorageResult<bool> {
        self.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM followers WHERE follower_id = ?1 AND following_id = ?2",
                params![follower_id, following_id],
            )?;
            if removed == 0 {
                return Ok(false);
            }

            tx.execute(
                "UPDATE users SET following_count = MAX(following_count - 1, 0) WHERE id = ?1",
                params![follower_id],
            )?;
            tx.execute(
                "UPDATE users SET followers_count = MAX(followers_count - 1, 0) WHERE id = ?1",
                params![following_id],
            )?;
            Ok(true)
        })
    }

    pub fn followers(&self, user_id: &str) -> StorageResult<Vec<User>> {
        self.follow_list(
            "SELECT u.id FROM followers f JOIN users u ON u.id = f.follower_id
             WHERE f.following_id = ?1",
            user_id,
        )
    }

    pub fn following(&self, user_id: &str) -> StorageResult<Vec<User>> {
        self.follow_list(
            "SELECT u.id FROM followers f JOIN users u ON u.id = f.following_id
             WHERE f.follower_id = ?1",
            user_id,
        )
    }

    fn follow_list(&self, id_query: &str, user_id: &str) -> StorageResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE id IN ({}) ORDER BY name",
            User::COLUMNS,
            id_query
        ))?;
        let users = stmt
            .query_map(params![user_id], User::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}
