use chrono::Utc;
use sqlx::{FromRow, SqliteConnection};
use std::collections::HashMap;

use crate::models::{NewTag, Post, PostTag, RelatedPost, Tag, TagChanges};

/// Post row joined with its pivot, as read from `post_tag`.
#[derive(FromRow)]
struct PostPivotRow {
    tag_id: i64,
    id: i64,
    user_id: i64,
    title: String,
    content: String,
    created_at: String,
    updated_at: String,
}

impl PostPivotRow {
    fn into_related(self) -> RelatedPost {
        let pivot = PostTag {
            post_id: self.id,
            tag_id: self.tag_id,
        };
        RelatedPost {
            post: Post {
                id: self.id,
                user_id: self.user_id,
                title: self.title,
                content: self.content,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            pivot,
        }
    }
}

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(conn)
        .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn create(conn: &mut SqliteConnection, tag: &NewTag) -> Result<Tag, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO tags (name, slug, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&tag.name)
    .bind(&tag.slug)
    .bind(&tag.created_at)
    .bind(&tag.created_at)
    .fetch_one(conn)
    .await
}

/// Apply the supplied fields only. `updated_at` is left alone when nothing changes.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &TagChanges,
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE tags
        SET name = COALESCE(?, name), slug = COALESCE(?, slug), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.slug)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn posts_for(conn: &mut SqliteConnection, tag_id: i64) -> Result<Vec<RelatedPost>, sqlx::Error> {
    let rows: Vec<PostPivotRow> = sqlx::query_as(
        r#"
        SELECT pt.tag_id, p.id, p.user_id, p.title, p.content, p.created_at, p.updated_at
        FROM posts p
        JOIN post_tag pt ON pt.post_id = p.id
        WHERE pt.tag_id = ?
        ORDER BY p.id
        "#,
    )
    .bind(tag_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(PostPivotRow::into_related).collect())
}

/// Every association grouped by tag, for eager-loading a tag listing.
pub async fn posts_by_tag(
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, Vec<RelatedPost>>, sqlx::Error> {
    let rows: Vec<PostPivotRow> = sqlx::query_as(
        r#"
        SELECT pt.tag_id, p.id, p.user_id, p.title, p.content, p.created_at, p.updated_at
        FROM posts p
        JOIN post_tag pt ON pt.post_id = p.id
        ORDER BY pt.tag_id, p.id
        "#,
    )
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<RelatedPost>> = HashMap::new();
    for row in rows {
        grouped.entry(row.tag_id).or_default().push(row.into_related());
    }
    Ok(grouped)
}
