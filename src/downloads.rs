use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::archiver::Archiver;
use crate::error::Error;
use crate::models::{Collection, CollectionItem, MediaAsset, StoredFile};
use crate::processor::EntityProcessor;
use crate::repo::{FileRepository, StyleRepository};
use crate::storage::FileStorage;

/// Registers produced archives as downloadable file records.
pub struct FileManager {
    files: Arc<FileRepository>,
    storage: Arc<dyn FileStorage>,
}

impl FileManager {
    pub fn new(files: Arc<FileRepository>, storage: Arc<dyn FileStorage>) -> Self {
        Self { files, storage }
    }

    /// Create a file record for an archive sitting at `path`.
    pub async fn create_archive_record(
        &self,
        owner_id: &str,
        path: &Path,
    ) -> Result<StoredFile, Error> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| Error::storage(path.display().to_string(), e))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive.zip".to_string());

        let uri = self
            .storage
            .uri_for_path(path)
            .unwrap_or_else(|| path.display().to_string());

        let file = StoredFile::new(
            owner_id.to_string(),
            uri,
            filename,
            metadata.len() as i64,
            "application/zip".to_string(),
        );
        self.files.insert(&file).await?;

        Ok(file)
    }
}

/// Composes the processor, archiver, and file manager into a single
/// downloadable artifact per request.
pub struct ArchiveOrchestrator {
    processor: Arc<EntityProcessor>,
    archiver: Archiver,
    storage: Arc<dyn FileStorage>,
    file_manager: Arc<FileManager>,
    styles: Arc<StyleRepository>,
}

impl ArchiveOrchestrator {
    pub fn new(
        processor: Arc<EntityProcessor>,
        archiver: Archiver,
        storage: Arc<dyn FileStorage>,
        file_manager: Arc<FileManager>,
        styles: Arc<StyleRepository>,
    ) -> Self {
        Self {
            processor,
            archiver,
            storage,
            file_manager,
            styles,
        }
    }

    /// Downloadable file for a whole collection: `None` when there is
    /// nothing to download, the sole source file when the manifest has a
    /// single entry (no archive is created), a registered zip otherwise.
    pub async fn download_for_collection(
        &self,
        collection: &Collection,
        items: &[CollectionItem],
    ) -> Result<Option<StoredFile>, Error> {
        let manifest = self.processor.process_items(items).await?;
        self.materialize(
            &collection.owner_id,
            manifest,
            &format!("private://tmp/collection/{}", collection.id),
            "Collection",
        )
        .await
    }

    /// Downloadable file for a single collection item.
    pub async fn download_for_item(
        &self,
        item: &CollectionItem,
        media: &MediaAsset,
    ) -> Result<Option<StoredFile>, Error> {
        let manifest = self.processor.process_item(item).await?;

        let mut label = media.name.clone();
        if let Some(style_id) = &item.style_id {
            if let Some(style) = self.styles.load(style_id).await? {
                label.push('_');
                label.push_str(&style.label);
            }
        }

        self.materialize(
            &item.owner_id,
            manifest,
            &format!("private://tmp/item/{}", item.id),
            &label,
        )
        .await
    }

    /// Downloadable file for a raw media asset.
    pub async fn download_for_media(
        &self,
        media: &MediaAsset,
    ) -> Result<Option<StoredFile>, Error> {
        let manifest = self.processor.process_media(media).await?;
        self.materialize(
            &media.owner_id,
            manifest,
            &format!("private://tmp/media/{}/{}", media.kind, media.id),
            &media.name,
        )
        .await
    }

    /// Downloadable styled file for an image asset.
    pub async fn download_for_styled_media(
        &self,
        media: &MediaAsset,
        style_id: &str,
    ) -> Result<Option<StoredFile>, Error> {
        let style = self
            .styles
            .load(style_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("image style {style_id}")))?;
        let manifest = self.processor.process_styled_media(media, &style).await?;
        self.materialize(
            &media.owner_id,
            manifest,
            &format!("private://tmp/media/{}/{}", media.kind, media.id),
            &format!("{}_{}", media.name, style.label),
        )
        .await
    }

    /// Archive a snapshot's items into `target_dir_uri`, regardless of
    /// manifest size. Returns `None` when the manifest holds no files.
    pub async fn archive_items(
        &self,
        owner_id: &str,
        items: &[CollectionItem],
        target_dir_uri: &str,
        label: &str,
    ) -> Result<Option<StoredFile>, Error> {
        let manifest = self.processor.process_items(items).await?;
        self.create_and_register(owner_id, &manifest, target_dir_uri, label)
            .await
    }

    async fn materialize(
        &self,
        owner_id: &str,
        manifest: Vec<crate::processor::ArchiveEntry>,
        target_dir_uri: &str,
        label: &str,
    ) -> Result<Option<StoredFile>, Error> {
        match manifest.len() {
            0 => Ok(None),
            // A single file is served as-is; zipping one file is overhead.
            1 => Ok(Some(manifest.into_iter().next().unwrap().file)),
            _ => {
                self.create_and_register(owner_id, &manifest, target_dir_uri, label)
                    .await
            }
        }
    }

    /// Build the zip in a staging directory, then move it to its final
    /// location and register it.
    async fn create_and_register(
        &self,
        owner_id: &str,
        manifest: &[crate::processor::ArchiveEntry],
        target_dir_uri: &str,
        label: &str,
    ) -> Result<Option<StoredFile>, Error> {
        if !self.storage.safe_mkdir(target_dir_uri) {
            tracing::warn!("Cannot create archive directory {target_dir_uri}");
            return Ok(None);
        }

        let name = archive_name(label);
        let staging_uri = format!("temporary://archive/{}/{}", Uuid::new_v4(), name);
        if !self.storage.safe_mkdir(&staging_uri) {
            tracing::warn!("Cannot create staging directory for {staging_uri}");
            return Ok(None);
        }

        let target_uri = format!("{}/{}", target_dir_uri.trim_end_matches('/'), name);
        let (Some(staging_path), Some(target_path)) = (
            self.storage.realpath(&staging_uri),
            self.storage.realpath(&target_uri),
        ) else {
            tracing::warn!("Cannot resolve archive target {target_uri}");
            return Ok(None);
        };

        match self.archiver.create_archive(&staging_path, manifest) {
            Ok(_) => {
                self.storage
                    .rename(&staging_uri, &target_uri)
                    .map_err(|e| Error::storage(target_uri.clone(), e))?;
                Ok(Some(
                    self.file_manager
                        .create_archive_record(owner_id, &target_path)
                        .await?,
                ))
            }
            Err(Error::NoContent) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Archive filename: `<Label>_<YYYY-MM-DD>.zip`.
pub fn archive_name(label: &str) -> String {
    format!("{label}_{}.zip", Utc::now().format("%Y-%m-%d"))
}
