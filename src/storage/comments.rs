use rusqlite::{params, Connection};

use super::{insert_notification, new_id, optional, posts, users, Storage, StorageError, StorageResult};
use crate::db::models::{Comment, NewComment, NewNotification};
use crate::domain::NotificationKind;

fn comment_by_id(conn: &Connection, id: &str) -> StorageResult<Option<Comment>> {
    optional(conn.query_row(
        &format!("SELECT {} FROM comments WHERE id = ?1", Comment::COLUMNS),
        params![id],
        Comment::from_row,
    ))
}

impl Storage {
    /// Newest first.
    pub fn comments_for_post(&self, post_id: &str) -> StorageResult<Vec<Comment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at DESC, rowid DESC",
            Comment::COLUMNS
        ))?;
        let comments = stmt
            .query_map(params![post_id], Comment::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn get_comment(&self, id: &str) -> StorageResult<Option<Comment>> {
        let conn = self.conn()?;
        comment_by_id(&conn, id)
    }

    /// Insert the comment, bump the post's comment counter and notify the
    /// post author (unless they commented on their own post).
    pub fn create_comment(&self, new_comment: NewComment) -> StorageResult<Comment> {
        self.write(|tx| {
            let post = posts::post_by_id(tx, &new_comment.post_id)?
                .ok_or(StorageError::NotFound("Post"))?;
            if users::user_by_id(tx, &new_comment.author_id)?.is_none() {
                return Err(StorageError::NotFound("User"));
            }

            let id = new_id();
            tx.execute(
                "INSERT INTO comments (id, content, post_id, author_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, new_comment.content, post.id, new_comment.author_id],
            )?;
            tx.execute(
                "UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?1",
                params![post.id],
            )?;

            if post.author_id != new_comment.author_id {
                let (title, message) = NotificationKind::Comment.default_text();
                insert_notification(
                    tx,
                    &NewNotification {
                        user_id: post.author_id.clone(),
                        kind: NotificationKind::Comment.to_string(),
                        title,
                        message,
                        from_user_id: Some(new_comment.author_id.clone()),
                        post_id: Some(post.id.clone()),
                    },
                )?;
            }

            comment_by_id(tx, &id)?.ok_or(StorageError::NotFound("Comment"))
        })
    }

    /// Returns false when the comment did not exist.
    pub fn delete_comment(&self, id: &str) -> StorageResult<bool> {
        self.write(|tx| {
            let Some(comment) = comment_by_id(tx, id)? else {
                return Ok(false);
            };
            tx.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
            tx.execute(
                "UPDATE posts SET comments_count = MAX(comments_count - 1, 0) WHERE id = ?1",
                params![comment.post_id],
            )?;
            Ok(true)
        })
    }
}
