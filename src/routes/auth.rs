use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::post,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::AppState;
use crate::auth::{login_user, logout_user};
use crate::error::AppError;
use crate::models::User;

#[derive(Deserialize)]
pub struct LoginForm {
    invite_code: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_submit))
        .route("/logout", post(logout))
}

async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE invite_code = ?")
        .bind(&form.invite_code)
        .fetch_optional(&state.db)
        .await?;

    match user {
        Some(user) => {
            login_user(&session, user).await?;
            Ok(Redirect::to("/").into_response())
        }
        None => Ok((StatusCode::UNAUTHORIZED, "Invalid invite code").into_response()),
    }
}

async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
