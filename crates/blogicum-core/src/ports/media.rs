//! Storage for uploaded post images.

use std::path::Path;

use async_trait::async_trait;

/// Extensions accepted for post images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Lower-cased extension of `file_name` if it names a supported image.
pub fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Media store trait - abstraction over where uploads end up.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Copy the uploaded file at `source` into the store.
    /// Returns the path relative to the media root, e.g. `images/<uuid>.png`.
    async fn store_image(&self, source: &Path, file_name: &str) -> Result<String, MediaError>;

    /// Remove a previously stored file. Missing files are not an error.
    async fn remove(&self, relative_path: &str) -> Result<(), MediaError>;
}

/// Media storage errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Storage I/O failed: {0}")]
    Io(String),
}
