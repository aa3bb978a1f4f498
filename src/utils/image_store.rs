use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Public URL prefix images are served under. Stored `image_path` values are
/// relative to the site root, e.g. `attendance_images/<hex>.jpg`.
pub const IMAGE_ROUTE: &str = "attendance_images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    pub relative_path: String,
}

impl StoredImage {
    pub fn url(&self) -> String {
        format!("/{}", self.relative_path)
    }
}

/// Flat directory of attendance photos named by random hex ids.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, bytes: &[u8]) -> io::Result<StoredImage> {
        let filename = format!("{}.jpg", Uuid::new_v4().to_simple());
        let path = self.dir.join(&filename);

        // create_new: never clobber, even on an id collision
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(StoredImage {
            relative_path: format!("{}/{}", IMAGE_ROUTE, filename),
            filename,
        })
    }

    /// Maps a client supplied filename to a file inside the store.
    ///
    /// Only a single plain segment is accepted, so nothing can resolve outside
    /// the store directory.
    pub async fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !is_safe_filename(filename) {
            return None;
        }
        let path = self.dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub async fn remove(&self, filename: &str) -> io::Result<()> {
        if !is_safe_filename(filename) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "unsafe filename"));
        }
        tokio::fs::remove_file(self.dir.join(filename)).await
    }
}

fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename.len() <= 255
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
