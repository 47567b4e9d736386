//! Path-addressed blob storage for uploaded files.
//!
//! Blobs live under a configured root directory and are referenced everywhere
//! else by their stored relative path. Public URLs are the configured base
//! URL with the stored path appended.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use metrics::counter;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Result of storing a payload.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: i64,
}

/// Filesystem-backed blob storage.
#[derive(Debug)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store the payload under `prefix` and return metadata describing the
    /// stored blob. The stored name embeds a fresh UUID, so concurrent
    /// uploads of the same filename never collide.
    pub async fn store(
        &self,
        prefix: &str,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredBlob, BlobStorageError> {
        if data.is_empty() {
            return Err(BlobStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(prefix, original_name)?;
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let size_bytes =
            i64::try_from(data.len()).map_err(|_| BlobStorageError::SizeOverflow)?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let checksum = hex::encode(hasher.finalize());

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(BlobStorageError::Io(err));
        }
        file.flush().await?;

        Ok(StoredBlob {
            stored_path,
            checksum,
            size_bytes,
        })
    }

    /// Attempt to read the stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, BlobStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), BlobStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobStorageError::Io(err)),
        }
    }

    /// Best-effort deletion for write paths: failures are logged and counted,
    /// never surfaced to the caller.
    pub async fn delete_quietly(&self, stored_path: &str) {
        if let Err(err) = self.delete(stored_path).await {
            counter!("lanterna_blob_delete_failed_total").increment(1);
            warn!(
                target = "lanterna::blob",
                path = stored_path,
                error = %err,
                "failed to delete stored blob"
            );
        }
    }

    /// Obtain the absolute filesystem path for a stored blob.
    pub fn absolute_path(&self, stored_path: &str) -> Result<PathBuf, BlobStorageError> {
        self.resolve(stored_path)
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, BlobStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(BlobStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

/// Public URL for a stored blob: configured base plus the stored path.
pub fn public_url(base: &Url, stored_path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        stored_path.trim_start_matches('/')
    )
}

fn build_stored_path(prefix: &str, original_name: &str) -> Result<String, BlobStorageError> {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() || prefix.split('/').any(|segment| segment == "..") {
        return Err(BlobStorageError::InvalidPath);
    }
    let identifier = Uuid::new_v4();
    let filename = sanitize_filename(original_name);
    Ok(format!("{prefix}/{identifier}-{filename}"))
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, BlobStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = BlobStorage::new(dir.path().to_path_buf()).expect("storage root");
        (dir, storage)
    }

    #[tokio::test]
    async fn store_and_read_roundtrip() {
        let (_dir, storage) = storage();

        let stored = storage
            .store("events/featured", "Poster Art.PNG", Bytes::from_static(b"png-bytes"))
            .await
            .expect("store");

        assert!(stored.stored_path.starts_with("events/featured/"));
        assert!(stored.stored_path.ends_with("-poster-art.png"));
        assert_eq!(stored.size_bytes, 9);

        let data = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(data, Bytes::from_static(b"png-bytes"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, storage) = storage();

        let stored = storage
            .store("applications/resumes", "resume.pdf", Bytes::from_static(b"%PDF"))
            .await
            .expect("store");

        storage.delete(&stored.stored_path).await.expect("delete");
        storage
            .delete(&stored.stored_path)
            .await
            .expect("second delete treats missing file as success");
    }

    #[tokio::test]
    async fn empty_payloads_are_rejected() {
        let (_dir, storage) = storage();
        let result = storage.store("journals/pdfs", "empty.pdf", Bytes::new()).await;
        assert!(matches!(result, Err(BlobStorageError::EmptyPayload)));
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let (_dir, storage) = storage();
        assert!(storage.absolute_path("../outside").is_err());
        assert!(storage.absolute_path("/etc/passwd").is_err());
        assert!(storage.absolute_path("events/ok.png").is_ok());
    }

    #[test]
    fn public_url_joins_base_and_path() {
        let base = Url::parse("https://cdn.example.org/media").expect("url");
        assert_eq!(
            public_url(&base, "events/featured/abc-poster.png"),
            "https://cdn.example.org/media/events/featured/abc-poster.png"
        );
    }

    #[test]
    fn filenames_are_slugified() {
        assert_eq!(sanitize_filename("Annual Report 2025.PDF"), "annual-report-2025.pdf");
        assert_eq!(sanitize_filename("....."), "upload");
    }
}
