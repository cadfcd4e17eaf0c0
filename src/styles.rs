use std::sync::Arc;

use crate::models::ImageStyle;
use crate::storage::{FileStorage, split_uri};

/// Generates and locates image-style derivatives.
///
/// Derivatives live next to their sources under a per-style prefix:
/// `private://media/a.jpg` styled with `thumbnail` becomes
/// `private://styles/thumbnail/media/a.jpg`. Generation is idempotent; an
/// existing derivative is left untouched.
pub struct StyleEngine {
    storage: Arc<dyn FileStorage>,
}

impl StyleEngine {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self { storage }
    }

    /// Target URI for a style applied to a source file URI, or `None`
    /// when the source URI is malformed.
    pub fn derivative_uri(&self, style: &ImageStyle, source_uri: &str) -> Option<String> {
        let (scheme, rest) = split_uri(source_uri)?;
        Some(format!("{scheme}://styles/{}/{rest}", style.id))
    }

    /// Create the derivative at `target_uri` from `source_uri`.
    ///
    /// Returns `true` when the derivative exists afterwards. Decode,
    /// resize, or write failures return `false`; callers skip the file
    /// and continue.
    pub fn create_derivative(&self, style: &ImageStyle, source_uri: &str, target_uri: &str) -> bool {
        if self.storage.exists(target_uri) {
            return true;
        }

        let Some(source_path) = self.storage.realpath(source_uri) else {
            tracing::warn!("Cannot resolve derivative source {source_uri}");
            return false;
        };
        let Some(target_path) = self.storage.realpath(target_uri) else {
            tracing::warn!("Cannot resolve derivative target {target_uri}");
            return false;
        };

        let image = match image::open(&source_path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Decoding {} failed: {e}", source_path.display());
                return false;
            }
        };

        let resized = image.thumbnail(style.width as u32, style.height as u32);

        if let Some(parent) = target_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Creating {} failed: {e}", parent.display());
                return false;
            }
        }

        if let Err(e) = resized.save(&target_path) {
            tracing::warn!("Writing derivative {} failed: {e}", target_path.display());
            return false;
        }

        true
    }
}
