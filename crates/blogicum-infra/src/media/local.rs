//! Filesystem-backed media store serving files under `MEDIA_ROOT`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use blogicum_core::ports::{MediaError, MediaStore, image_extension};

const IMAGES_DIR: &str = "images";

/// Stores post images as `<root>/images/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    /// Create the store, making sure the images directory exists.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(IMAGES_DIR))
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored relative path, refusing anything that escapes the root.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(relative_path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::Io(format!(
                "refusing media path outside the root: {relative_path}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store_image(&self, source: &Path, file_name: &str) -> Result<String, MediaError> {
        let ext = image_extension(file_name)
            .ok_or_else(|| MediaError::UnsupportedType(file_name.to_string()))?;

        let relative = format!("{IMAGES_DIR}/{}.{ext}", Uuid::new_v4());
        let target = self.root.join(&relative);

        tokio::fs::copy(source, &target)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        tracing::debug!(file_name, stored = %relative, "Stored uploaded image");
        Ok(relative)
    }

    async fn remove(&self, relative_path: &str) -> Result<(), MediaError> {
        let path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }
}
