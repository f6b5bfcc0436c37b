use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;

use super::post::{PostTag, RelatedPost};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

impl NewTag {
    pub fn new(name: String, slug: String) -> Self {
        Self {
            name,
            slug,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagWithPosts {
    #[serde(flatten)]
    pub tag: Tag,
    pub posts: Vec<RelatedPost>,
}

/// A tag reached through the `post_tag` association, carrying the pivot row.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedTag {
    #[serde(flatten)]
    pub tag: Tag,
    pub pivot: PostTag,
}

/// Derive a URL-safe slug: lower-cased, every run of non-alphanumeric
/// characters collapsed into one `-`, no leading or trailing `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
