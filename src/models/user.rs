use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::post::Post;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub invite_code: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a user row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub invite_code: String,
    pub created_at: String,
}

impl NewUser {
    pub fn new(name: String, email: String) -> Self {
        Self {
            name,
            email,
            invite_code: Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithPosts {
    #[serde(flatten)]
    pub user: User,
    pub posts: Vec<Post>,
}
