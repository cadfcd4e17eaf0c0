use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::processor::ArchiveEntry;

/// Packs manifest entries into a zip archive.
pub struct Archiver;

impl Archiver {
    pub fn new() -> Self {
        Self
    }

    /// Create (or overwrite) a zip at `target` from the manifest.
    ///
    /// Duplicate archive paths keep the first occurrence. Entries whose
    /// source cannot be read are skipped with a warning. A manifest that
    /// yields zero stored entries removes the empty container and returns
    /// `Error::NoContent`; failure to open the target path is fatal.
    pub fn create_archive(&self, target: &Path, manifest: &[ArchiveEntry]) -> Result<PathBuf, Error> {
        let file = File::create(target)
            .map_err(|e| Error::storage(target.display().to_string(), e))?;
        let mut archive = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut added = 0usize;

        for entry in manifest {
            // Leading slash trimmed for portability of the entry names.
            let name = entry.archive_path.trim_start_matches('/');

            if !seen.insert(name) {
                continue;
            }

            let contents = match std::fs::read(&entry.system_path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Skipping unreadable {}: {e}", entry.system_path.display());
                    continue;
                }
            };

            archive
                .start_file(name, options)
                .and_then(|()| archive.write_all(&contents).map_err(Into::into))
                .map_err(|e| {
                    Error::storage(
                        target.display().to_string(),
                        std::io::Error::other(e.to_string()),
                    )
                })?;
            added += 1;
        }

        archive
            .finish()
            .map_err(|e| {
                Error::storage(
                    target.display().to_string(),
                    std::io::Error::other(e.to_string()),
                )
            })?;

        if added == 0 {
            std::fs::remove_file(target).ok();
            return Err(Error::NoContent);
        }

        Ok(target.to_path_buf())
    }
}
