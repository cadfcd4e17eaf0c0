use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Error;
use crate::locator::FileLocator;
use crate::models::{CollectionItem, ImageStyle, MediaAsset, MediaKind, StoredFile};
use crate::repo::{MediaRepository, StyleRepository};
use crate::storage::FileStorage;

/// One archivable file: where it lives on disk and where it goes inside
/// the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub file: StoredFile,
    pub system_path: PathBuf,
    pub archive_path: String,
}

/// Ordered list of entries for a single download or share request.
pub type ArchiveManifest = Vec<ArchiveEntry>;

/// Walks collection items and media assets into archive manifests.
///
/// Archive-internal layout: `/{KindLabel}/{filename}` for plain files,
/// `/{KindLabel}/{StyleLabel}/{filename}` for styled images. Files whose
/// storage location cannot be resolved produce no entry.
pub struct EntityProcessor {
    locator: Arc<FileLocator>,
    media: Arc<MediaRepository>,
    styles: Arc<StyleRepository>,
    storage: Arc<dyn FileStorage>,
}

impl EntityProcessor {
    pub fn new(
        locator: Arc<FileLocator>,
        media: Arc<MediaRepository>,
        styles: Arc<StyleRepository>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            locator,
            media,
            styles,
            storage,
        }
    }

    /// Manifest for a raw media asset, no styling applied.
    pub async fn process_media(&self, media: &MediaAsset) -> Result<ArchiveManifest, Error> {
        let directory = format!("/{}", media.kind.label());
        let files = self.locator.resolve_files(media).await?;
        Ok(self.entries_for(files, &directory))
    }

    /// Manifest for an image asset under a style. Archive names come
    /// from the source file; the entry content is the styled derivative.
    pub async fn process_styled_media(
        &self,
        media: &MediaAsset,
        style: &ImageStyle,
    ) -> Result<ArchiveManifest, Error> {
        let directory = format!("/{}/{}", media.kind.label(), style.label);
        let pairs = self.locator.resolve_styled_files(media, style).await?;

        let entries = pairs
            .into_iter()
            .filter_map(|(source, styled)| {
                let Some(system_path) = self.storage.realpath(&styled.uri) else {
                    tracing::warn!("Cannot resolve {} to a system path", styled.uri);
                    return None;
                };
                Some(ArchiveEntry {
                    system_path,
                    archive_path: format!("{directory}/{}", source.filename),
                    file: styled,
                })
            })
            .collect();

        Ok(entries)
    }

    /// Manifest for one collection item. Styled dispatch only applies to
    /// image media carrying a style reference.
    pub async fn process_item(&self, item: &CollectionItem) -> Result<ArchiveManifest, Error> {
        let media = self
            .media
            .load(&item.media_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("media {}", item.media_id)))?;

        if media.kind == MediaKind::Image {
            if let Some(style_id) = &item.style_id {
                let style = self
                    .styles
                    .load(style_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("image style {style_id}")))?;
                return self.process_styled_media(&media, &style).await;
            }
        }

        self.process_media(&media).await
    }

    /// Concatenated manifests for every item, preserving item order.
    pub async fn process_items(&self, items: &[CollectionItem]) -> Result<ArchiveManifest, Error> {
        let mut manifest = Vec::new();

        for item in items {
            manifest.extend(self.process_item(item).await?);
        }

        Ok(manifest)
    }

    fn entries_for(&self, files: Vec<StoredFile>, directory: &str) -> ArchiveManifest {
        files
            .into_iter()
            .filter_map(|file| {
                let Some(system_path) = self.storage.realpath(&file.uri) else {
                    tracing::warn!("Cannot resolve {} to a system path", file.uri);
                    return None;
                };
                let archive_path = format!("{directory}/{}", file.filename);
                Some(ArchiveEntry {
                    system_path,
                    archive_path,
                    file,
                })
            })
            .collect()
    }
}
