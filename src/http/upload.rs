//! Image uploads
//!
//! Uploaded images are written to a directory on disk that the router serves
//! at `/uploads`; the habit only stores the resulting URL.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Path the upload directory is served under
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Multipart field the habit image is sent in
pub const IMAGE_FIELD: &str = "image";

/// An image received in a multipart form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Name of the file on the client, if sent
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// An image written to the upload directory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(dir: PathBuf, public_base_url: &str) -> Self {
        Self {
            dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it is missing
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write the image to disk; the result carries the URL it is served at
    pub async fn save(&self, image: &UploadedImage) -> io::Result<StoredImage> {
        let file_name = stored_file_name(image, Utc::now());
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes).await?;

        tracing::debug!("Stored upload {} ({} bytes)", file_name, image.bytes.len());
        Ok(StoredImage {
            path,
            url: format!("{}{}/{}", self.public_base_url, UPLOADS_ROUTE, file_name),
        })
    }

    /// Remove an image whose request failed after it was saved
    pub async fn discard(&self, image: &StoredImage) {
        match tokio::fs::remove_file(&image.path).await {
            Ok(()) => tracing::debug!("Discarded upload {}", image.path.display()),
            Err(e) => tracing::warn!("Failed to discard upload {}: {}", image.path.display(), e),
        }
    }
}

/// `image-<unix millis>-<9 random digits><.ext>`
fn stored_file_name(image: &UploadedImage, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;

    format!(
        "{}-{}-{}{}",
        IMAGE_FIELD,
        now.timestamp_millis(),
        suffix,
        extension(image.file_name.as_deref())
    )
}

/// The client's file extension, kept only if it is plain alphanumeric
fn extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
