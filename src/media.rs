//! Media upload storage.
//!
//! Uploaded image files land in one flat directory under generated,
//! collision-free names and are later served statically by filename.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Content types the upload filter accepts.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

pub fn is_allowed_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to store media file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Created once at startup so per-request writes never race a mkdir.
    pub async fn ensure_dir(&self) -> Result<(), MediaError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Persist one uploaded file under a generated name and return that name.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let filename = generated_name(original_name);
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        Ok(filename)
    }
}

/// `{uuid}-{unix millis}{original extension}` - unique by construction, so
/// concurrent uploads need no cross-request coordination.
pub fn generated_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!(
        "{}-{}{}",
        Uuid::new_v4(),
        chrono::Utc::now().timestamp_millis(),
        extension
    )
}
