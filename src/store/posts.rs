use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;

use crate::models::{NewPost, Post, PostChanges, PostTag, RelatedTag, Tag};

/// Tag row joined with its pivot, as read from `post_tag`.
#[derive(FromRow)]
struct TagPivotRow {
    post_id: i64,
    id: i64,
    name: String,
    slug: String,
    created_at: String,
    updated_at: String,
}

impl TagPivotRow {
    fn into_related(self) -> RelatedTag {
        let pivot = PostTag {
            post_id: self.post_id,
            tag_id: self.id,
        };
        RelatedTag {
            tag: Tag {
                id: self.id,
                name: self.name,
                slug: self.slug,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            pivot,
        }
    }
}

/// Outcome of [`sync_tags`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncChanges {
    pub attached: Vec<i64>,
    pub detached: Vec<i64>,
}

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM posts ORDER BY id")
        .fetch_all(conn)
        .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn create(conn: &mut SqliteConnection, post: &NewPost) -> Result<Post, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO posts (user_id, title, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(post.user_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.created_at)
    .bind(&post.created_at)
    .fetch_one(conn)
    .await
}

/// Apply the supplied fields only. `updated_at` is left alone when nothing changes.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &PostChanges,
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE posts
        SET user_id = COALESCE(?, user_id),
            title = COALESCE(?, title),
            content = COALESCE(?, content),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(changes.user_id)
    .bind(&changes.title)
    .bind(&changes.content)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Association rows are removed by the `ON DELETE CASCADE` on `post_tag`.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Add `tag_ids` to the post's tag set without touching existing members.
pub async fn attach_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    for &tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tag (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Make the post's tag set exactly `tag_ids`. Members already present are left
/// in place; only the difference is written.
///
/// The first statement is a write, so inside a transaction the write lock is
/// taken before anything is read.
pub async fn sync_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_ids: &[i64],
) -> Result<SyncChanges, sqlx::Error> {
    let mut delete = QueryBuilder::<Sqlite>::new("DELETE FROM post_tag WHERE post_id = ");
    delete.push_bind(post_id);
    if !tag_ids.is_empty() {
        delete.push(" AND tag_id NOT IN (");
        let mut ids = delete.separated(", ");
        for &tag_id in tag_ids {
            ids.push_bind(tag_id);
        }
        ids.push_unseparated(")");
    }
    delete.push(" RETURNING tag_id");

    let detached: Vec<(i64,)> = delete.build_query_as().fetch_all(&mut *conn).await?;
    let mut detached: Vec<i64> = detached.into_iter().map(|(id,)| id).collect();
    detached.sort_unstable();

    let mut attached = Vec::new();
    for &tag_id in tag_ids {
        let inserted = sqlx::query("INSERT OR IGNORE INTO post_tag (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if inserted > 0 {
            attached.push(tag_id);
        }
    }

    Ok(SyncChanges { attached, detached })
}

pub async fn tags_for(conn: &mut SqliteConnection, post_id: i64) -> Result<Vec<RelatedTag>, sqlx::Error> {
    let rows: Vec<TagPivotRow> = sqlx::query_as(
        r#"
        SELECT pt.post_id, t.id, t.name, t.slug, t.created_at, t.updated_at
        FROM tags t
        JOIN post_tag pt ON pt.tag_id = t.id
        WHERE pt.post_id = ?
        ORDER BY t.id
        "#,
    )
    .bind(post_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(TagPivotRow::into_related).collect())
}

/// Every association grouped by post, for eager-loading a post listing.
pub async fn tags_by_post(
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, Vec<RelatedTag>>, sqlx::Error> {
    let rows: Vec<TagPivotRow> = sqlx::query_as(
        r#"
        SELECT pt.post_id, t.id, t.name, t.slug, t.created_at, t.updated_at
        FROM tags t
        JOIN post_tag pt ON pt.tag_id = t.id
        ORDER BY pt.post_id, t.id
        "#,
    )
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<RelatedTag>> = HashMap::new();
    for row in rows {
        grouped.entry(row.post_id).or_default().push(row.into_related());
    }
    Ok(grouped)
}
