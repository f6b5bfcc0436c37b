use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::User;
use crate::store::users;
use crate::AppState;

const USER_ID_KEY: &str = "user_id";

/// The signed-in caller, loaded fresh from the store on every request.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| Unauthenticated.into_response())?;

        let user_id: Option<i64> = session.get(USER_ID_KEY).await.ok().flatten();
        let Some(user_id) = user_id else {
            return Err(Unauthenticated.into_response());
        };

        let mut conn = state
            .db
            .acquire()
            .await
            .map_err(|e| AppError::from(e).into_response())?;
        let user = users::find_by_id(&mut conn, user_id)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        user.map(AuthUser)
            .ok_or_else(|| Unauthenticated.into_response())
    }
}

pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthenticated." })),
        )
            .into_response()
    }
}

pub async fn login_user(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.insert(USER_ID_KEY, user.id).await
}

pub async fn logout_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
