use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;

pub const PRIVATE_SCHEME: &str = "private";
pub const PUBLIC_SCHEME: &str = "public";
pub const TEMPORARY_SCHEME: &str = "temporary";

/// Durable file storage addressed by scheme-prefixed logical paths
/// (`private://media/photo.jpg`). The core never touches raw filesystem
/// paths directly; everything goes through this boundary so a non-local
/// backend can be swapped in.
pub trait FileStorage: Send + Sync {
    /// Resolve a logical URI to an absolute path, or `None` for an
    /// unknown scheme.
    fn realpath(&self, uri: &str) -> Option<PathBuf>;

    fn exists(&self, uri: &str) -> bool;

    fn read(&self, uri: &str) -> io::Result<Vec<u8>>;

    fn write(&self, uri: &str, contents: &[u8]) -> io::Result<()>;

    fn rename(&self, src_uri: &str, dst_uri: &str) -> io::Result<()>;

    /// Recursively create a directory. When the URI names a file (has an
    /// extension), its parent directory is created instead. Idempotent;
    /// returns `false` on failure.
    fn safe_mkdir(&self, uri: &str) -> bool;

    /// Map an absolute path back to a logical URI if it lives under one
    /// of the storage roots.
    fn uri_for_path(&self, path: &Path) -> Option<String>;
}

/// Splits `scheme://relative/path` into its parts.
pub fn split_uri(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once("://")?;
    Some((scheme, rest.trim_start_matches('/')))
}

/// Local-disk backend mapping each scheme to a configured root directory.
pub struct LocalStorage {
    roots: Vec<(&'static str, PathBuf)>,
}

impl LocalStorage {
    pub fn new(config: &Config) -> Self {
        Self {
            roots: vec![
                (PRIVATE_SCHEME, config.private_dir.clone()),
                (PUBLIC_SCHEME, config.public_dir.clone()),
                (TEMPORARY_SCHEME, config.temporary_dir.clone()),
            ],
        }
    }

    fn root(&self, scheme: &str) -> Option<&Path> {
        self.roots
            .iter()
            .find(|(s, _)| *s == scheme)
            .map(|(_, p)| p.as_path())
    }
}

impl FileStorage for LocalStorage {
    fn realpath(&self, uri: &str) -> Option<PathBuf> {
        let (scheme, rest) = split_uri(uri)?;
        Some(self.root(scheme)?.join(rest))
    }

    fn exists(&self, uri: &str) -> bool {
        self.realpath(uri).is_some_and(|p| p.exists())
    }

    fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        let path = self
            .realpath(uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown scheme: {uri}")))?;
        fs::read(path)
    }

    fn write(&self, uri: &str, contents: &[u8]) -> io::Result<()> {
        let path = self
            .realpath(uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown scheme: {uri}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    fn rename(&self, src_uri: &str, dst_uri: &str) -> io::Result<()> {
        let src = self
            .realpath(src_uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown scheme: {src_uri}")))?;
        let dst = self
            .realpath(dst_uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown scheme: {dst_uri}")))?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        // Cross-device renames fall back to copy + remove.
        match fs::rename(&src, &dst) {
            Ok(()) => Ok(()),
            Err(_) => {
                fs::copy(&src, &dst)?;
                fs::remove_file(&src)
            }
        }
    }

    fn safe_mkdir(&self, uri: &str) -> bool {
        let Some(path) = self.realpath(uri) else {
            return false;
        };
        let dir = if path.extension().is_some() {
            match path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return false,
            }
        } else {
            path
        };
        dir.is_dir() || fs::create_dir_all(&dir).is_ok()
    }

    fn uri_for_path(&self, path: &Path) -> Option<String> {
        for (scheme, root) in &self.roots {
            if let Ok(rel) = path.strip_prefix(root) {
                let rel = rel.to_string_lossy().replace('\\', "/");
                return Some(format!("{scheme}://{rel}"));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(&Config {
            base_url: "http://localhost".to_string(),
            private_dir: dir.join("private"),
            public_dir: dir.join("public"),
            temporary_dir: dir.join("tmp"),
            smtp_relay: None,
            smtp_from: None,
        })
    }

    #[test]
    fn split_uri_parses_scheme_and_rest() {
        assert_eq!(
            split_uri("private://media/a.jpg"),
            Some(("private", "media/a.jpg"))
        );
        assert_eq!(split_uri("no-scheme-here"), None);
    }

    #[test]
    fn roundtrip_write_read_and_uri_mapping() {
        let dir = std::env::temp_dir().join(format!("mediatheque-storage-{}", uuid::Uuid::new_v4()));
        let storage = storage(&dir);

        storage
            .write("private://media/hello.txt", b"hello")
            .unwrap();
        assert!(storage.exists("private://media/hello.txt"));
        assert_eq!(storage.read("private://media/hello.txt").unwrap(), b"hello");

        let abs = storage.realpath("private://media/hello.txt").unwrap();
        assert_eq!(
            storage.uri_for_path(&abs).as_deref(),
            Some("private://media/hello.txt")
        );

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn safe_mkdir_strips_file_component() {
        let dir = std::env::temp_dir().join(format!("mediatheque-mkdir-{}", uuid::Uuid::new_v4()));
        let storage = storage(&dir);

        assert!(storage.safe_mkdir("private://tmp/archive/out.zip"));
        assert!(storage.realpath("private://tmp/archive").unwrap().is_dir());
        // Repeated calls are no-ops.
        assert!(storage.safe_mkdir("private://tmp/archive/out.zip"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unknown_scheme_resolves_to_none() {
        let dir = std::env::temp_dir().join(format!("mediatheque-scheme-{}", uuid::Uuid::new_v4()));
        let storage = storage(&dir);
        assert!(storage.realpath("s3://bucket/key").is_none());
        assert!(!storage.safe_mkdir("s3://bucket/key"));
    }
}
