use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::models::{NewUser, Post, User, UserChanges};

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(conn)
        .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_by_invite_code(
    conn: &mut SqliteConnection,
    invite_code: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE invite_code = ?")
        .bind(invite_code)
        .fetch_optional(conn)
        .await
}

pub async fn create(conn: &mut SqliteConnection, user: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO users (name, email, invite_code, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.invite_code)
    .bind(&user.created_at)
    .bind(&user.created_at)
    .fetch_one(conn)
    .await
}

/// Apply the supplied fields only. `updated_at` is left alone when nothing changes.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &UserChanges,
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name), email = COALESCE(?, email), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn posts_for(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM posts WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Every post grouped by owner, for eager-loading a user listing.
pub async fn posts_by_user(
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, Vec<Post>>, sqlx::Error> {
    let posts: Vec<Post> = sqlx::query_as("SELECT * FROM posts ORDER BY id")
        .fetch_all(conn)
        .await?;

    let mut grouped: HashMap<i64, Vec<Post>> = HashMap::new();
    for post in posts {
        grouped.entry(post.user_id).or_default().push(post);
    }
    Ok(grouped)
}
