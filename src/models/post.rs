use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;

use super::tag::RelatedTag;
use super::user::User;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl NewPost {
    pub fn new(user_id: i64, title: String, content: String) -> Self {
        Self {
            user_id,
            title,
            content,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Partial update: `None` leaves the column as it is.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.title.is_none() && self.content.is_none()
    }
}

/// A post with its owner and tag set loaded.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub user: Option<User>,
    pub tags: Vec<RelatedTag>,
}

/// A post reached through the `post_tag` association, carrying the pivot row.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedPost {
    #[serde(flatten)]
    pub post: Post,
    pub pivot: PostTag,
}

/// Row of the `post_tag` association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct PostTag {
    pub post_id: i64,
    pub tag_id: i64,
}
