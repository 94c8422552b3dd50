use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Folder an uploaded image lands in, relative to the public disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageCategory {
    Hero,
    Gallery,
    Coach,
    #[strum(serialize = "sejarah")]
    #[serde(rename = "sejarah")]
    History,
}

impl ImageCategory {
    pub fn dir(self) -> &'static str {
        match self {
            ImageCategory::Hero => "hero",
            ImageCategory::Gallery => "gallery",
            ImageCategory::Coach => "coach",
            ImageCategory::History => "sejarah",
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.split(';').next().map(str::trim) {
        Some("image/jpeg") | Some("image/jpg") => Some("jpg"),
        Some("image/png") => Some("png"),
        Some("image/webp") => Some("webp"),
        _ => None,
    }
}

/// Public disk for uploaded images. Writes are plain blocking file I/O;
/// callers run them on the blocking pool.
#[derive(Debug, Clone)]
pub struct PublicStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl PublicStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checks type and size before anything touches the disk.
    pub fn check_upload(&self, content_type: &str, len: usize) -> Result<&'static str, ApiError> {
        let ext = extension_for(content_type).ok_or_else(|| {
            ApiError::BadRequest("Only jpeg, png and webp images are accepted".into())
        })?;
        if len == 0 {
            return Err(ApiError::BadRequest("Image body is empty".into()));
        }
        if len > self.max_bytes {
            return Err(ApiError::BadRequest(format!(
                "Image exceeds the {} byte limit",
                self.max_bytes
            )));
        }
        Ok(ext)
    }

    /// Writes the image and returns its path relative to the public disk.
    pub fn store(
        &self,
        category: ImageCategory,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        let ext = self.check_upload(content_type, bytes.len())?;
        let relative = format!("{}/{}.{}", category.dir(), Uuid::new_v4().to_simple(), ext);
        let full = self.root.join(&relative);

        let write = || -> io::Result<()> {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, bytes)
        };
        write().map_err(|e| {
            tracing::error!(error = %e, path = %full.display(), "Failed to write image");
            ApiError::Internal("Failed to store image".into())
        })?;

        debug!(path = %relative, "Stored image");
        Ok(relative)
    }

    /// Single-slot images: the old file is removed before the new one is
    /// written. Removal failures are logged and ignored.
    pub fn replace(
        &self,
        category: ImageCategory,
        previous: Option<&str>,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        self.check_upload(content_type, bytes.len())?;
        if let Some(old) = previous {
            self.delete(old);
        }
        self.store(category, content_type, bytes)
    }

    /// Best effort; returns whether a file was removed.
    pub fn delete(&self, relative: &str) -> bool {
        let Some(full) = self.resolve(relative) else {
            warn!(path = relative, "Refusing to delete path outside the public disk");
            return false;
        };
        match fs::remove_file(&full) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(error = %e, path = %full.display(), "Failed to delete image");
                false
            }
        }
    }

    /// Only plain relative paths are accepted.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let plain = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        plain.then(|| self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> PublicStorage {
        PublicStorage::new(dir.path(), 1024)
    }

    #[test]
    fn stores_under_category_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(&dir);
        let path = s.store(ImageCategory::History, "image/png", b"png-bytes").unwrap();
        assert!(path.starts_with("sejarah/"));
        assert!(path.ends_with(".png"));
        assert_eq!(fs::read(dir.path().join(&path)).unwrap(), b"png-bytes");
    }

    #[test]
    fn replace_deletes_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(&dir);
        let first = s.store(ImageCategory::Hero, "image/jpeg", b"one").unwrap();
        let second = s
            .replace(ImageCategory::Hero, Some(&first), "image/jpeg", b"two")
            .unwrap();
        assert!(!dir.path().join(&first).exists());
        assert!(dir.path().join(&second).exists());
    }

    #[test]
    fn rejects_unknown_types_and_oversized_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(&dir);
        assert!(s.store(ImageCategory::Gallery, "application/pdf", b"x").is_err());
        assert!(s.store(ImageCategory::Gallery, "image/png", &[0u8; 2048]).is_err());
        assert!(s.store(ImageCategory::Gallery, "image/png", b"").is_err());
        assert!(s.check_upload("image/jpeg; charset=binary", 10).is_ok());
    }

    #[test]
    fn failed_replace_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(&dir);
        let first = s.store(ImageCategory::Coach, "image/webp", b"one").unwrap();
        assert!(s.replace(ImageCategory::Coach, Some(&first), "text/plain", b"two").is_err());
        assert!(dir.path().join(&first).exists());
    }

    #[test]
    fn delete_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(&dir);
        assert!(!s.delete("../etc/passwd"));
        assert!(!s.delete("/etc/passwd"));
        assert!(!s.delete("gallery/missing.png"));
    }
}
