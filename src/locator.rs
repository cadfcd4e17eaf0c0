use std::sync::Arc;

use crate::error::Error;
use crate::models::{ImageStyle, MediaAsset, MediaKind, StoredFile};
use crate::repo::{FileRepository, MediaRepository};
use crate::storage::FileStorage;
use crate::styles::StyleEngine;

/// Resolves a media asset to its concrete source files, generating styled
/// derivatives on demand.
pub struct FileLocator {
    media: Arc<MediaRepository>,
    files: Arc<FileRepository>,
    styles: Arc<StyleEngine>,
    storage: Arc<dyn FileStorage>,
}

impl FileLocator {
    pub fn new(
        media: Arc<MediaRepository>,
        files: Arc<FileRepository>,
        styles: Arc<StyleEngine>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            media,
            files,
            styles,
            storage,
        }
    }

    /// Every file attached to the asset's slots, walked in the kind's
    /// priority order. Empty slots are skipped.
    pub async fn resolve_files(&self, media: &MediaAsset) -> Result<Vec<StoredFile>, Error> {
        let mut files = Vec::new();

        for slot in media.kind.file_slots() {
            files.extend(self.media.files_in_slot(&media.id, slot).await?);
        }

        Ok(files)
    }

    /// Styled variants of an image asset's files, paired as
    /// `(source, styled)`.
    ///
    /// A missing derivative is generated on the spot and registered as a
    /// file record; a file whose derivative cannot be generated is
    /// dropped with a warning rather than failing the whole resolution.
    pub async fn resolve_styled_files(
        &self,
        media: &MediaAsset,
        style: &ImageStyle,
    ) -> Result<Vec<(StoredFile, StoredFile)>, Error> {
        if media.kind != MediaKind::Image {
            return Err(Error::invalid("only image assets can be styled"));
        }

        let mut styled = Vec::new();

        for source in self.resolve_files(media).await? {
            let Some(target_uri) = self.styles.derivative_uri(style, &source.uri) else {
                tracing::warn!("Skipping malformed file uri {}", source.uri);
                continue;
            };

            if !self.styles.create_derivative(style, &source.uri, &target_uri) {
                tracing::warn!(
                    "Derivative generation failed for {} (style {})",
                    source.uri,
                    style.id
                );
                continue;
            }

            // Re-resolving an existing derivative reuses its record.
            let file = match self.files.find_by_uri(&target_uri).await? {
                Some(existing) => existing,
                None => {
                    let filesize = self
                        .storage
                        .realpath(&target_uri)
                        .and_then(|path| std::fs::metadata(path).ok())
                        .map_or(0, |metadata| metadata.len() as i64);

                    let file = StoredFile::new(
                        media.owner_id.clone(),
                        target_uri,
                        format!("{}_{}", style.label, source.filename),
                        filesize,
                        source.filemime.clone(),
                    );
                    self.files.insert(&file).await?;
                    file
                }
            };
            styled.push((source, file));
        }

        Ok(styled)
    }
}
