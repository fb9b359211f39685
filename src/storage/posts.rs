use rusqlite::{params, Connection};

use super::{new_id, optional, users, Storage, StorageError, StorageResult};
use crate::db::models::{NewPost, Post, PostImage, PostUpdate};

pub(super) fn post_by_id(conn: &Connection, id: &str) -> StorageResult<Option<Post>> {
    optional(conn.query_row(
        &format!("SELECT {} FROM posts WHERE id = ?1", Post::COLUMNS),
        params![id],
        Post::from_row,
    ))
}

pub(super) fn query_posts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StorageResult<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(params, Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Cascade-delete a post and everything that references it, then decrement
/// the author's post counter. Caller supplies the transaction.
pub(super) fn delete_post_in(conn: &Connection, id: &str) -> StorageResult<bool> {
    let Some(post) = post_by_id(conn, id)? else {
        return Ok(false);
    };

    for table in ["comments", "upvotes", "saves", "post_images", "reports", "notifications"] {
        conn.execute(
            &format!("DELETE FROM {} WHERE post_id = ?1", table),
            params![id],
        )?;
    }
    conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    conn.execute(
        "UPDATE users SET posts_count = MAX(posts_count - 1, 0) WHERE id = ?1",
        params![post.author_id],
    )?;

    Ok(true)
}

impl Storage {
    /// Newest first.
    pub fn list_posts(&self, limit: u32, offset: u32) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        query_posts(
            &conn,
            &format!(
                "SELECT {} FROM posts ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                Post::COLUMNS
            ),
            params![limit, offset],
        )
    }

    pub fn list_posts_by_category(
        &self,
        category: &str,
        limit: u32,
        offset: u32,
    ) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        query_posts(
            &conn,
            &format!(
                "SELECT {} FROM posts WHERE category = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
                Post::COLUMNS
            ),
            params![category, limit, offset],
        )
    }

    /// The `window` most recent posts, reordered by upvotes. The sort is
    /// stable so recency breaks ties.
    pub fn trending_posts(&self, window: u32) -> StorageResult<Vec<Post>> {
        let mut posts = self.list_posts(window, 0)?;
        posts.sort_by(|a, b| b.upvotes_count.cmp(&a.upvotes_count));
        Ok(posts)
    }

    pub fn get_post(&self, id: &str) -> StorageResult<Option<Post>> {
        let conn = self.conn()?;
        post_by_id(&conn, id)
    }

    pub fn posts_by_author(&self, author_id: &str) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        query_posts(
            &conn,
            &format!(
                "SELECT {} FROM posts WHERE author_id = ?1 ORDER BY created_at DESC, rowid DESC",
                Post::COLUMNS
            ),
            params![author_id],
        )
    }

    /// Insert a post with its images (kept in the given order) and bump the
    /// author's post counter.
    pub fn create_post(
        &self,
        new_post: NewPost,
        images: &[String],
    ) -> StorageResult<(Post, Vec<PostImage>)> {
        self.write(|tx| {
            if users::user_by_id(tx, &new_post.author_id)?.is_none() {
                return Err(StorageError::NotFound("User"));
            }

            let id = new_id();
            tx.execute(
                "INSERT INTO posts (id, title, content, category, tags, cover_image_url, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    new_post.title,
                    new_post.content,
                    new_post.category,
                    new_post.tags,
                    new_post.cover_image_url,
                    new_post.author_id
                ],
            )?;
            tx.execute(
                "UPDATE users SET posts_count = posts_count + 1 WHERE id = ?1",
                params![new_post.author_id],
            )?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO post_images (id, post_id, image_url, position) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (position, url) in images.iter().enumerate() {
                    stmt.execute(params![new_id(), id, url, position as i64])?;
                }
            }

            let post = post_by_id(tx, &id)?.ok_or(StorageError::NotFound("Post"))?;
            let images = images_for(tx, &id)?;
            tracing::debug!(post_id = %post.id, images = images.len(), "Created post");
            Ok((post, images))
        })
    }

    pub fn update_post(&self, id: &str, update: PostUpdate) -> StorageResult<Option<Post>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE posts SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                category = COALESCE(?4, category),
                tags = COALESCE(?5, tags),
                cover_image_url = COALESCE(?6, cover_image_url)
             WHERE id = ?1",
            params![
                id,
                update.title,
                update.content,
                update.category,
                update.tags,
                update.cover_image_url
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        post_by_id(&conn, id)
    }

    /// Returns false when the post did not exist.
    pub fn delete_post(&self, id: &str) -> StorageResult<bool> {
        self.write(|tx| delete_post_in(tx, id))
    }

    pub fn post_images(&self, post_id: &str) -> StorageResult<Vec<PostImage>> {
        let conn = self.conn()?;
        images_for(&conn, post_id)
    }
}

fn images_for(conn: &Connection, post_id: &str) -> StorageResult<Vec<PostImage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM post_images WHERE post_id = ?1 ORDER BY position, created_at, rowid",
        PostImage::COLUMNS
    ))?;
    let images = stmt
        .query_map(params![post_id], PostImage::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}
