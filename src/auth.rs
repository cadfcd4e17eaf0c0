use axum::{
    extract::FromRequestParts,
    http::StatusCode,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::User;

const USER_ID_KEY: &str = "user_id";

pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| Unauthorized)?;

        let user: Option<User> = session.get(USER_ID_KEY).await.ok().flatten();

        user.map(AuthUser).ok_or(Unauthorized)
    }
}

pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Authentication required").into_response()
    }
}

pub async fn login_user(
    session: &Session,
    user: User,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(USER_ID_KEY, user).await
}

pub async fn logout_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
