use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use sqlx::SqliteConnection;

use crate::error::AppError;
use crate::input::Input;
use crate::models::{NewUser, User, UserChanges, UserWithPosts};
use crate::response;
use crate::store::users;
use crate::validation::{Presence, Validator};
use crate::AppState;

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(show_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

/// `current` is the id of the user being updated, excluded from the email
/// uniqueness check; `None` on create.
async fn check_user(
    conn: &mut SqliteConnection,
    v: &mut Validator<'_>,
    current: Option<i64>,
) -> Result<UserChanges, sqlx::Error> {
    let presence = match current {
        Some(_) => Presence::SometimesRequired,
        None => Presence::Required,
    };

    let name = v.string("name", presence, Some(NAME_MAX));

    let mut email = v.string("email", presence, Some(EMAIL_MAX));
    if let Some(value) = email.take() {
        if v.email("email", &value)
            && v.unique(conn, "email", &value, "users", "email", current).await?
        {
            email = Some(value);
        }
    }

    Ok(UserChanges { name, email })
}

async fn validate_new_user(conn: &mut SqliteConnection, input: &Input) -> Result<NewUser, AppError> {
    let mut v = Validator::new(input);
    let UserChanges { name, email } = check_user(conn, &mut v, None).await?;
    let user = name.zip(email).map(|(name, email)| NewUser::new(name, email));
    Ok(v.finish_with(user)?)
}

async fn validate_user_update(
    conn: &mut SqliteConnection,
    input: &Input,
    id: i64,
) -> Result<UserChanges, AppError> {
    let mut v = Validator::new(input);
    let changes = check_user(conn, &mut v, Some(id)).await?;
    Ok(v.finish_with(Some(changes))?)
}

async fn find_user(conn: &mut SqliteConnection, id: i64) -> Result<User, AppError> {
    users::find_by_id(conn, id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    let all = users::list_all(&mut conn).await?;
    let mut posts = users::posts_by_user(&mut conn).await?;

    let data: Vec<UserWithPosts> = all
        .into_iter()
        .map(|user| UserWithPosts {
            posts: posts.remove(&user.id).unwrap_or_default(),
            user,
        })
        .collect();

    Ok(response::ok(data, "Users retrieved successfully"))
}

async fn create_user(
    State(state): State<AppState>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    let new_user = validate_new_user(&mut conn, &input).await?;
    let user = users::create(&mut conn, &new_user).await?;

    tracing::info!(user_id = user.id, "user created");
    Ok(response::created(user, "User created successfully"))
}

async fn show_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let user = find_user(&mut conn, id).await?;
    let posts = users::posts_for(&mut conn, id).await?;
    Ok(response::ok(UserWithPosts { user, posts }, "User retrieved successfully"))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;

    find_user(&mut conn, id).await?;
    let changes = validate_user_update(&mut conn, &input, id).await?;
    users::update(&mut conn, id, &changes).await?;
    let user = find_user(&mut conn, id).await?;

    tracing::info!(user_id = id, "user updated");
    Ok(response::ok(user, "User updated successfully"))
}

/// Posts owned by the user go with it through `ON DELETE CASCADE`.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    find_user(&mut conn, id).await?;
    users::delete(&mut conn, id).await?;

    tracing::info!(user_id = id, "user deleted");
    Ok(response::done("User deleted successfully"))
}
