use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use sqlx::SqliteConnection;

use crate::error::AppError;
use crate::input::Input;
use crate::models::{slugify, NewTag, Tag, TagChanges, TagWithPosts};
use crate::response;
use crate::store::tags;
use crate::validation::{Presence, Validator};
use crate::AppState;

const NAME_MAX: usize = 255;
const SLUG_MAX: usize = 255;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route(
            "/tags/{id}",
            get(show_tag)
                .put(update_tag)
                .patch(update_tag)
                .delete(delete_tag),
        )
}

/// Check `name` and `slug` for a tag. `current` is the id of the tag being
/// updated, excluded from uniqueness checks; `None` on create.
///
/// When a valid `name` arrives without a `slug` key, the slug is derived from
/// the name and must be non-empty and unique as well.
async fn check_tag(
    conn: &mut SqliteConnection,
    v: &mut Validator<'_>,
    input: &Input,
    current: Option<i64>,
) -> Result<TagChanges, sqlx::Error> {
    let presence = match current {
        Some(_) => Presence::SometimesRequired,
        None => Presence::Required,
    };

    let mut name = v.string("name", presence, Some(NAME_MAX));
    if let Some(value) = name.take() {
        if v.unique(conn, "name", &value, "tags", "name", current).await? {
            name = Some(value);
        }
    }

    let mut slug = v.string("slug", Presence::Sometimes, Some(SLUG_MAX));
    if let Some(value) = slug.take() {
        if v.unique(conn, "slug", &value, "tags", "slug", current).await? {
            slug = Some(value);
        }
    }

    if !input.has("slug") {
        if let Some(value) = name.take() {
            let derived = slugify(&value);
            if derived.is_empty() {
                v.fail("name", "The name must contain at least one letter or number.");
            } else if v.unique(conn, "slug", &derived, "tags", "slug", current).await? {
                slug = Some(derived);
                name = Some(value);
            }
        }
    }

    Ok(TagChanges { name, slug })
}

async fn validate_new_tag(conn: &mut SqliteConnection, input: &Input) -> Result<NewTag, AppError> {
    let mut v = Validator::new(input);
    let TagChanges { name, slug } = check_tag(conn, &mut v, input, None).await?;
    let tag = name.zip(slug).map(|(name, slug)| NewTag::new(name, slug));
    Ok(v.finish_with(tag)?)
}

async fn validate_tag_update(
    conn: &mut SqliteConnection,
    input: &Input,
    id: i64,
) -> Result<TagChanges, AppError> {
    let mut v = Validator::new(input);
    let changes = check_tag(conn, &mut v, input, Some(id)).await?;
    Ok(v.finish_with(Some(changes))?)
}

async fn find_tag(conn: &mut SqliteConnection, id: i64) -> Result<Tag, AppError> {
    tags::find_by_id(conn, id)
        .await?
        .ok_or(AppError::NotFound("Tag not found"))
}

async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    let all = tags::list_all(&mut conn).await?;
    let mut posts = tags::posts_by_tag(&mut conn).await?;

    let data: Vec<TagWithPosts> = all
        .into_iter()
        .map(|tag| TagWithPosts {
            posts: posts.remove(&tag.id).unwrap_or_default(),
            tag,
        })
        .collect();

    Ok(response::ok(data, "Tags retrieved successfully"))
}

async fn create_tag(
    State(state): State<AppState>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    let new_tag = validate_new_tag(&mut conn, &input).await?;
    let tag = tags::create(&mut conn, &new_tag).await?;

    tracing::info!(tag_id = tag.id, slug = %tag.slug, "tag created");
    Ok(response::created(tag, "Tag created successfully"))
}

async fn show_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let tag = find_tag(&mut conn, id).await?;
    let posts = tags::posts_for(&mut conn, id).await?;
    Ok(response::ok(TagWithPosts { tag, posts }, "Tag retrieved successfully"))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    find_tag(&mut conn, id).await?;
    let changes = validate_tag_update(&mut conn, &input, id).await?;
    tags::update(&mut conn, id, &changes).await?;
    let tag = find_tag(&mut conn, id).await?;

    tracing::info!(tag_id = id, "tag updated");
    Ok(response::ok(tag, "Tag updated successfully"))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    find_tag(&mut conn, id).await?;
    tags::delete(&mut conn, id).await?;

    tracing::info!(tag_id = id, "tag deleted");
    Ok(response::done("Tag deleted successfully"))
}
