use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::{AppError, Error};
use crate::models::{MediaKind, User};
use crate::sharing::absolute_share_url;

#[derive(Serialize)]
struct SharedItemView {
    id: String,
    media_id: String,
    media_name: String,
    kind: MediaKind,
    style_id: Option<String>,
}

#[derive(Serialize)]
struct SharedCollectionView {
    id: String,
    url: String,
    items: Vec<SharedItemView>,
    has_archive: bool,
    download_url: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailsForm {
    emails: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collection/share", post(share_collection))
        .route("/collection/shared/{date}/{uuid}", get(view_shared))
        .route(
            "/collection/shared/{date}/{uuid}/download",
            get(download_shared),
        )
        .route("/collection/shared/{date}/{uuid}/emails", post(add_emails))
}

async fn share_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let (shared, is_new) = state.sharing.share_for_owner(&user.id).await?;

    Ok(Json(serde_json::json!({
        "message": "OK",
        "is_new": is_new,
        "share_url": {
            "relative": shared.url,
            "absolute": absolute_share_url(&state.base_url, &shared.url),
        },
    })))
}

async fn view_shared(
    State(state): State<AppState>,
    Path((date, uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state
        .sharing
        .load_shared(&uuid)
        .await?
        .ok_or_else(|| Error::not_found(format!("shared collection for {date}")))?;

    let mut items = Vec::new();
    for item in state.collections.items_for_shared(&shared.id).await? {
        let media = state
            .media
            .load(&item.media_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("media {}", item.media_id)))?;

        items.push(SharedItemView {
            id: item.id,
            media_id: media.id,
            media_name: media.name,
            kind: media.kind,
            style_id: item.style_id,
        });
    }

    let download_url = shared
        .archive_file_id
        .is_some()
        .then(|| format!("{}/download", shared.url));

    Ok(Json(SharedCollectionView {
        has_archive: shared.archive_file_id.is_some(),
        download_url,
        id: shared.id,
        url: shared.url,
        items,
    }))
}

async fn download_shared(
    State(state): State<AppState>,
    Path((date, uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state
        .sharing
        .load_shared(&uuid)
        .await?
        .ok_or_else(|| Error::not_found(format!("shared collection for {date}")))?;

    let archive_id = shared.archive_file_id.as_ref().ok_or(Error::NoContent)?;

    let file = state
        .files
        .load(archive_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("file {archive_id}")))?;

    Ok(state.responses.build(&file, None, None)?)
}

async fn add_emails(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((_date, uuid)): Path<(String, String)>,
    Json(form): Json<EmailsForm>,
) -> Result<impl IntoResponse, AppError> {
    let shared = state
        .sharing
        .load_shared(&uuid)
        .await?
        .filter(|shared| shared.owner_id == user.id)
        .ok_or_else(|| Error::not_found(format!("shared collection {uuid}")))?;

    let outcome = state.sharing.add_recipient_emails(&shared, &form.emails).await?;

    let owner: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&shared.owner_id)
        .fetch_one(&state.db)
        .await?;

    let all_emails = state.sharing.emails(&shared.id).await?;
    let report = state.mailer.send_collection(&shared, &owner, &all_emails).await?;

    Ok(Json(serde_json::json!({
        "added": outcome.added,
        "duplicates": outcome.duplicates,
        "invalid": outcome.invalid,
        "sent": report.sent,
        "failed": report.failed,
    })))
}
