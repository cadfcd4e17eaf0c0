use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::{AppError, Error};
use crate::models::{Collection, MediaKind};

#[derive(Deserialize)]
pub struct ItemSelection {
    media_id: String,
    style_id: Option<String>,
}

#[derive(Serialize)]
struct ItemView {
    id: String,
    media_id: String,
    media_name: String,
    kind: MediaKind,
    style_id: Option<String>,
    download_url: String,
}

#[derive(Serialize)]
struct CollectionView {
    collection: Option<Collection>,
    items: Vec<ItemView>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collection", get(view_collection))
        .route("/collection/item", post(add_item))
        .route("/collection/item", delete(remove_item))
        .route("/collection/clear", post(clear_collection))
        .route("/collection/download", get(download_collection))
        .route("/collection/item/{id}/download", get(download_item))
}

async fn view_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let Some(collection) = state.collections.load_for_owner(&user.id).await? else {
        return Ok(Json(CollectionView {
            collection: None,
            items: Vec::new(),
        }));
    };

    let mut views = Vec::new();
    for item in state.collections.items(&collection).await? {
        let media = state
            .media
            .load(&item.media_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("media {}", item.media_id)))?;

        views.push(ItemView {
            download_url: format!("/collection/item/{}/download", item.id),
            id: item.id,
            media_id: media.id,
            media_name: media.name,
            kind: media.kind,
            style_id: item.style_id,
        });
    }

    Ok(Json(CollectionView {
        collection: Some(collection),
        items: views,
    }))
}

/// Validate a selection: the media must exist, and a style may only be
/// attached to image media.
async fn validate_selection(
    state: &AppState,
    selection: &ItemSelection,
) -> Result<(), Error> {
    let media = state
        .media
        .load(&selection.media_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("media {}", selection.media_id)))?;

    if let Some(style_id) = &selection.style_id {
        state
            .styles
            .load(style_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("image style {style_id}")))?;

        if media.kind != MediaKind::Image {
            return Err(Error::invalid("only image assets can be styled"));
        }
    }

    Ok(())
}

async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(selection): Json<ItemSelection>,
) -> Result<impl IntoResponse, AppError> {
    validate_selection(&state, &selection).await?;

    let collection = state.collections.get_or_create_for_owner(&user.id).await?;
    let added = state
        .collections
        .add_item(&collection, &selection.media_id, selection.style_id.as_deref())
        .await?;

    Ok(Json(serde_json::json!({ "added": added })))
}

async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(selection): Json<ItemSelection>,
) -> Result<impl IntoResponse, AppError> {
    let Some(collection) = state.collections.load_for_owner(&user.id).await? else {
        return Ok(Json(serde_json::json!({ "removed": 0 })));
    };

    let removed = state
        .collections
        .remove_item(&collection, &selection.media_id, selection.style_id.as_deref())
        .await?;

    Ok(Json(serde_json::json!({ "removed": removed })))
}

async fn clear_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let collection = state.collections.get_or_create_for_owner(&user.id).await?;
    state.collections.clear(&collection).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn download_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let collection = state
        .collections
        .load_for_owner(&user.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("collection for user {}", user.id)))?;

    let items = state.collections.items(&collection).await?;
    let file = state
        .orchestrator
        .download_for_collection(&collection, &items)
        .await?
        .ok_or(Error::NoContent)?;

    Ok(state.responses.build(&file, None, None)?)
}

async fn download_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .collections
        .load_item(&id)
        .await?
        .filter(|item| item.owner_id == user.id)
        .ok_or_else(|| Error::not_found(format!("collection item {id}")))?;

    let media = state
        .media
        .load(&item.media_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("media {}", item.media_id)))?;

    let file = state
        .orchestrator
        .download_for_item(&item, &media)
        .await?
        .ok_or(Error::NoContent)?;

    Ok(state.responses.build(&file, None, None)?)
}
