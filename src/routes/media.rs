use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::{AppError, Error};
use crate::models::{MediaKind, StoredFile};

#[derive(Serialize)]
struct FileView {
    id: String,
    filename: String,
    filemime: String,
    filesize: i64,
}

impl From<StoredFile> for FileView {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            filemime: file.filemime,
            filesize: file.filesize,
        }
    }
}

#[derive(Serialize)]
struct MediaView {
    id: String,
    kind: MediaKind,
    name: String,
    files: Vec<FileView>,
    download_url: String,
    styled_download_urls: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/media", get(list_media))
        .route("/media/{id}/download", get(download_media))
        .route("/media/{id}/download/{style}", get(download_styled_media))
}

async fn list_media(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let styles = state.styles.list().await?;
    let mut views = Vec::new();

    for media in state.media.list().await? {
        let mut files = Vec::new();
        for slot in media.kind.file_slots() {
            files.extend(
                state
                    .media
                    .files_in_slot(&media.id, slot)
                    .await?
                    .into_iter()
                    .map(FileView::from),
            );
        }

        let styled_download_urls = if media.kind == MediaKind::Image {
            styles
                .iter()
                .map(|style| format!("/media/{}/download/{}", media.id, style.id))
                .collect()
        } else {
            Vec::new()
        };

        views.push(MediaView {
            download_url: format!("/media/{}/download", media.id),
            styled_download_urls,
            id: media.id,
            kind: media.kind,
            name: media.name,
            files,
        });
    }

    Ok(Json(views))
}

async fn download_media(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let media = state
        .media
        .load(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("media {id}")))?;

    let file = state
        .orchestrator
        .download_for_media(&media)
        .await?
        .ok_or(Error::NoContent)?;

    Ok(state.responses.build(&file, None, None)?)
}

async fn download_styled_media(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path((id, style_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let media = state
        .media
        .load(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("media {id}")))?;

    let style = state
        .styles
        .load(&style_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("image style {style_id}")))?;

    let file = state
        .orchestrator
        .download_for_styled_media(&media, &style.id)
        .await?
        .ok_or(Error::NoContent)?;

    let description = format!("{} ({})", media.name, style.label);

    Ok(state.responses.build(&file, Some(&description), None)?)
}
