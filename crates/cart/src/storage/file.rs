use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Storage;
use crate::error::StorageError;

/// Filesystem storage: one file per key under a directory.
///
/// Keys are mapped to file names by replacing anything outside
/// `[A-Za-z0-9._-]` with `_`. Values are written to a temporary sibling and
/// renamed over the target, so a crash mid-write leaves the previous value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_owned(),
        source,
    }
}

impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(key, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &value)
            .await
            .map_err(|e| io_error(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(key, e))?;

        debug!(path = %path.display(), bytes = value.len(), "Wrote storage file");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> FileStorage {
        FileStorage::new(std::env::temp_dir().join(format!("cart-file-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_path_for_sanitizes_key() {
        let storage = FileStorage::new("/data");
        assert_eq!(
            storage.path_for("@shop:cart/v1"),
            PathBuf::from("/data/_shop_cart_v1.json")
        );
        assert_eq!(
            storage.path_for("cart-snapshot"),
            PathBuf::from("/data/cart-snapshot.json")
        );
    }

    #[tokio::test]
    async fn test_get_before_any_write() {
        let storage = temp_storage();
        assert!(storage.get("cart-snapshot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let storage = temp_storage();
        storage.set("cart-snapshot", b"[1]".to_vec()).await.unwrap();
        storage.set("cart-snapshot", b"[2]".to_vec()).await.unwrap();

        assert_eq!(storage.get("cart-snapshot").await.unwrap().unwrap(), b"[2]");
        assert!(!storage.path_for("cart-snapshot").with_extension("json.tmp").exists());

        tokio::fs::remove_dir_all(storage.dir()).await.unwrap();
    }
}
