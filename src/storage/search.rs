use rusqlite::params;

use super::{escape_like, posts, Storage, StorageResult};
use crate::db::models::{Post, User};

impl Storage {
    /// Case-insensitive substring match on title, content and tags.
    pub fn search_posts(&self, query: &str) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        let pattern = escape_like(query);
        posts::query_posts(
            &conn,
            &format!(
                "SELECT {} FROM posts
                 WHERE unicode_lower(title) LIKE '%' || unicode_lower(?1) || '%' ESCAPE '\\'
                    OR unicode_lower(content) LIKE '%' || unicode_lower(?1) || '%' ESCAPE '\\'
                    OR unicode_lower(tags) LIKE '%' || unicode_lower(?1) || '%' ESCAPE '\\'
                 ORDER BY created_at DESC, rowid DESC",
                Post::COLUMNS
            ),
            params![pattern],
        )
    }

    /// Case-insensitive substring match on name and email, capped at `limit`.
    pub fn search_users(&self, query: &str, limit: u32) -> StorageResult<Vec<User>> {
        let conn = self.conn()?;
        let pattern = escape_like(query);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users
             WHERE unicode_lower(name) LIKE '%' || unicode_lower(?1) || '%' ESCAPE '\\'
                OR unicode_lower(email) LIKE '%' || unicode_lower(?1) || '%' ESCAPE '\\'
             ORDER BY name LIMIT ?2",
            User::COLUMNS
        ))?;
        let users = stmt
            .query_map(params![pattern, limit], User::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}
