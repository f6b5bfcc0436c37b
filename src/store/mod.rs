//! Repository functions over the SQLite store.
//!
//! Every function takes a `&mut SqliteConnection` so the same code runs on a
//! pooled connection or inside a transaction (`&mut *tx`). Relations are never
//! traversed implicitly: callers ask for them with the `*_for` helpers.

pub mod posts;
pub mod tags;
pub mod users;

use sqlx::SqliteConnection;

/// Whether a row with primary key `id` exists in `table`.
pub async fn exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let (found,): (i64,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"
    ))
    .bind(id)
    .fetch_one(conn)
    .await?;

    Ok(found != 0)
}

/// Whether `value` is already used in `table.column`, ignoring the row `ignore_id`.
pub async fn is_taken(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    value: &str,
    ignore_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let (taken,): (i64,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = ? AND (? IS NULL OR id != ?))"
    ))
    .bind(value)
    .bind(ignore_id)
    .bind(ignore_id)
    .fetch_one(conn)
    .await?;

    Ok(taken != 0)
}
