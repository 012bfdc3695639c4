use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal(err.to_string())
    }
}

// 1. StorageService Contract
/// StorageService
///
/// Where uploaded bytes live. The media service only ever talks to this trait, so the
/// local-disk store used in deployment and the in-memory one used by tests are
/// interchangeable.
///
/// Keys are relative, `/`-separated names (e.g. `hero-a1b2c3d4.jpg`). Implementations
/// must reject keys that would escape their root.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the storage root if needed. Called once at startup.
    async fn ensure_root(&self) -> Result<(), StorageError>;

    /// Writes `bytes` under `key`, replacing any previous object, and returns the path
    /// the object was stored at.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Deletes the object. Missing objects are not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// URL under which the object is served to browsers.
    fn public_url(&self, key: &str) -> String;
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key cannot walk out of the storage root.
pub fn sanitize_key(key: &str) -> Result<String, StorageError> {
    let cleaned = key
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if cleaned.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(cleaned)
}

// 2. The Real Implementation (local disk)
/// LocalDiskStorage
///
/// Stores objects as plain files under `root`. The router serves the same directory at
/// `public_base` (normally `/uploads`).
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let key = sanitize_key(key)?;
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), "stored object");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.root.join(sanitize_key(key)?);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        let key = sanitize_key(key).unwrap_or_default();
        format!("{}/{}", self.public_base, key)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Keeps objects in a shared map so tests can inspect what the media pipeline wrote.
/// `new_failing` makes every write fail, for error-path tests.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all writes return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_root(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        let key = sanitize_key(key)?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), bytes);
        Ok(format!("mock://{key}"))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key)?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/uploads/{}", sanitize_key(key).unwrap_or_default())
    }
}

/// StorageState
///
/// The type shared through `AppState`.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_strips_traversal() {
        assert_eq!(sanitize_key("../../etc/passwd").unwrap(), "etc/passwd");
        assert_eq!(sanitize_key("./a//b.png").unwrap(), "a/b.png");
        assert_eq!(sanitize_key("..\\secret.txt").unwrap(), "secret.txt");
        assert!(sanitize_key("../..").is_err());
    }

    #[tokio::test]
    async fn local_disk_round_trips_and_tolerates_missing_removal() {
        let root = std::env::temp_dir().join(format!("morphe-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalDiskStorage::new(&root, "/uploads/");
        storage.ensure_root().await.unwrap();

        let path = storage.put("nested/file.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
        assert_eq!(storage.public_url("nested/file.txt"), "/uploads/nested/file.txt");

        storage.remove("nested/file.txt").await.unwrap();
        storage.remove("nested/file.txt").await.unwrap();
        assert!(tokio::fs::metadata(&path).await.is_err());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
