use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;

use crate::auth::{login_user, logout_user, AuthUser};
use crate::error::AppError;
use crate::input::Input;
use crate::response;
use crate::store::users;
use crate::validation::{Presence, ValidationErrors, Validator};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    input: Input,
) -> Result<impl IntoResponse, AppError> {
    let mut v = Validator::new(&input);
    let invite_code = v.string("invite_code", Presence::Required, None);
    v.finish()?;

    // the session store shares the pool, so release the connection first
    let user = match invite_code {
        Some(code) => {
            let mut conn = state.db.acquire().await?;
            users::find_by_invite_code(&mut conn, &code).await?
        }
        None => None,
    };

    let Some(user) = user else {
        let mut errors = ValidationErrors::default();
        errors.add("invite_code", "The selected invite code is invalid.");
        return Err(errors.into());
    };

    login_user(&session, &user).await?;

    tracing::info!(user_id = user.id, "user signed in");
    Ok(response::ok(user, "Signed in successfully"))
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(response::done("Signed out successfully"))
}

/// The caller's own record, unwrapped.
async fn current_user(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(user)
}
