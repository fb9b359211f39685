use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A user row as stored, including the password hash. Never serialized;
/// responses go through [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
    pub expertise: Option<String>,
    pub reputation_score: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_admin: bool,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, email, password_hash, name, bio, profile_pic_url, \
         expertise, reputation_score, followers_count, following_count, posts_count, \
         is_admin, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            bio: row.get(4)?,
            profile_pic_url: row.get(5)?,
            expertise: row.get(6)?,
            reputation_score: row.get(7)?,
            followers_count: row.get(8)?,
            following_count: row.get(9)?,
            posts_count: row.get(10)?,
            is_admin: row.get(11)?,
            created_at: row.get(12)?,
        })
    }
}

/// User record without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
    pub expertise: Option<String>,
    pub reputation_score: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            bio: user.bio,
            profile_pic_url: user.profile_pic_url,
            expertise: user.expertise,
            reputation_score: user.reputation_score,
            followers_count: user.followers_count,
            following_count: user.following_count,
            posts_count: user.posts_count,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Option<String>,
    pub cover_image_url: Option<String>,
    pub author_id: String,
    pub upvotes_count: i64,
    pub saves_count: i64,
    pub comments_count: i64,
    pub created_at: String,
}

impl Post {
    pub const COLUMNS: &'static str = "id, title, content, category, tags, cover_image_url, \
         author_id, upvotes_count, saves_count, comments_count, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            category: row.get(3)?,
            tags: row.get(4)?,
            cover_image_url: row.get(5)?,
            author_id: row.get(6)?,
            upvotes_count: row.get(7)?,
            saves_count: row.get(8)?,
            comments_count: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Option<String>,
    pub cover_image_url: Option<String>,
    pub author_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImage {
    pub id: String,
    pub post_id: String,
    pub image_url: String,
    pub position: i64,
    pub created_at: String,
}

impl PostImage {
    pub const COLUMNS: &'static str = "id, post_id, image_url, position, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            image_url: row.get(2)?,
            position: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub post_id: String,
    pub author_id: String,
    pub created_at: String,
}

impl Comment {
    pub const COLUMNS: &'static str = "id, content, post_id, author_id, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            post_id: row.get(2)?,
            author_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub post_id: String,
    pub author_id: String,
}

/// An upvote or save row; both tables share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: String,
}

impl Engagement {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            user_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

impl Follow {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            follower_id: row.get(1)?,
            following_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub from_user_id: Option<String>,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    pub const COLUMNS: &'static str =
        "id, user_id, type, title, message, from_user_id, post_id, is_read, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            title: row.get(3)?,
            message: row.get(4)?,
            from_user_id: row.get(5)?,
            post_id: row.get(6)?,
            is_read: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub from_user_id: Option<String>,
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub post_id: String,
    pub reporter_id: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
}

impl Report {
    pub const COLUMNS: &'static str = "id, post_id, reporter_id, reason, status, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            reporter_id: row.get(2)?,
            reason: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub post_id: String,
    pub reporter_id: String,
    pub reason: String,
}
