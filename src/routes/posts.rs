use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::error::AppError;
use crate::input::Input;
use crate::models::{NewPost, Post, PostChanges, PostWithRelations, User};
use crate::response;
use crate::store::{posts, users};
use crate::validation::{Presence, Validator};
use crate::AppState;

const TITLE_MAX: usize = 255;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(show_post)
                .put(update_post)
                .patch(update_post)
                .delete(delete_post),
        )
}

struct CreatePost {
    post: NewPost,
    tags: Option<Vec<i64>>,
}

struct UpdatePost {
    changes: PostChanges,
    tags: Option<Vec<i64>>,
}

async fn validate_create(
    conn: &mut SqliteConnection,
    input: &Input,
) -> Result<CreatePost, AppError> {
    let mut v = Validator::new(input);
    let user_id = v.existing_id(conn, "user_id", Presence::Required, "users").await?;
    let title = v.string("title", Presence::Required, Some(TITLE_MAX));
    let content = v.string("content", Presence::Required, None);
    let tags = v.existing_ids(conn, "tags", "tags").await?;

    let request = user_id
        .zip(title)
        .zip(content)
        .map(|((user_id, title), content)| CreatePost {
            post: NewPost::new(user_id, title, content),
            tags,
        });
    Ok(v.finish_with(request)?)
}

async fn validate_update(
    conn: &mut SqliteConnection,
    input: &Input,
) -> Result<UpdatePost, AppError> {
    let mut v = Validator::new(input);
    let user_id = v
        .existing_id(conn, "user_id", Presence::SometimesRequired, "users")
        .await?;
    let title = v.string("title", Presence::SometimesRequired, Some(TITLE_MAX));
    let content = v.string("content", Presence::SometimesRequired, None);
    let tags = v.existing_ids(conn, "tags", "tags").await?;

    Ok(v.finish_with(Some(UpdatePost {
        changes: PostChanges {
            user_id,
            title,
            content,
        },
        tags,
    }))?)
}

async fn with_relations(
    conn: &mut SqliteConnection,
    post: Post,
) -> Result<PostWithRelations, AppError> {
    let user = users::find_by_id(conn, post.user_id).await?;
    let tags = posts::tags_for(conn, post.id).await?;
    Ok(PostWithRelations { post, user, tags })
}

async fn find_post(conn: &mut SqliteConnection, id: i64) -> Result<Post, AppError> {
    posts::find_by_id(conn, id)
        .await?
        .ok_or(AppError::NotFound("Post not found"))
}

async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    let all = posts::list_all(&mut conn).await?;
    let owners: HashMap<i64, User> = users::list_all(&mut conn)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let mut tags = posts::tags_by_post(&mut conn).await?;

    let data: Vec<PostWithRelations> = all
        .into_iter()
        .map(|post| PostWithRelations {
            user: owners.get(&post.user_id).cloned(),
            tags: tags.remove(&post.id).unwrap_or_default(),
            post,
        })
        .collect();

    Ok(response::ok(data, "Posts retrieved successfully"))
}

/// Validation reads run on a plain pooled connection. The transaction opens
/// with the INSERT so it takes the write lock first and never has to upgrade
/// a read lock held alongside other writers.
async fn create_post(
    State(state): State<AppState>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let request = {
        let mut conn = state.db.acquire().await?;
        validate_create(&mut conn, &input).await?
    };

    let mut tx = state.db.begin().await?;
    let post = posts::create(&mut tx, &request.post).await?;
    if let Some(tag_ids) = &request.tags {
        posts::attach_tags(&mut tx, post.id, tag_ids).await?;
    }
    let data = with_relations(&mut tx, post).await?;
    tx.commit().await?;

    tracing::info!(post_id = data.post.id, tags = data.tags.len(), "post created");
    Ok(response::created(data, "Post created successfully"))
}

async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let post = find_post(&mut conn, id).await?;
    let data = with_relations(&mut conn, post).await?;
    Ok(response::ok(data, "Post retrieved successfully"))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let request = {
        let mut conn = state.db.acquire().await?;
        find_post(&mut conn, id).await?;
        validate_update(&mut conn, &input).await?
    };

    let mut tx = state.db.begin().await?;
    posts::update(&mut tx, id, &request.changes).await?;
    if let Some(tag_ids) = &request.tags {
        let synced = posts::sync_tags(&mut tx, id, tag_ids).await?;
        tracing::info!(
            post_id = id,
            attached = synced.attached.len(),
            detached = synced.detached.len(),
            "tags synced"
        );
    }
    let post = find_post(&mut tx, id).await?;
    let data = with_relations(&mut tx, post).await?;
    tx.commit().await?;

    tracing::info!(post_id = id, "post updated");
    Ok(response::ok(data, "Post updated successfully"))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    find_post(&mut conn, id).await?;
    posts::delete(&mut conn, id).await?;

    tracing::info!(post_id = id, "post deleted");
    Ok(response::done("Post deleted successfully"))
}
