//! Object storage for uploaded files and avatars.
//!
//! Objects are addressed by slash-separated keys such as `7/docs/1760-a.pdf`.
//! The database keeps metadata only; bytes live behind [`StorageBackend`].

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use docket_core::{Error, Result};

/// Storage backend trait for object bytes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under `key`, replacing any existing object.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the object stored under `key`.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete the object under `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// All object keys below `prefix`, recursively, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Filesystem storage backend rooted at a base directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a key to a path, refusing anything that escapes the root.
    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Storage(format!("invalid object key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }

    /// Validate that the backend can write, read, and delete objects.
    pub async fn validate(&self) -> Result<()> {
        let key = ".health-check/probe.bin";
        let data = b"storage-health-check";
        self.write(key, data).await?;
        if self.read(key).await? != data {
            return Err(Error::Storage("read-back mismatch".to_string()));
        }
        self.delete(key).await?;
        let _ = fs::remove_dir(self.base_path.join(".health-check")).await;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(
            subsystem = "storage",
            op = "write",
            storage_key = %key,
            size = data.len(),
            "Writing object"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(subsystem = "storage", parent = %parent.display(), error = %e, "create_dir_all failed");
                e
            })?;
        }

        // Temp file then rename, so readers never see a partial object.
        let mut temp_name = full_path.clone().into_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(subsystem = "storage", from = %temp_path.display(), to = %full_path.display(), error = %e, "rename failed");
            e
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key)?;
        match fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object {key}")))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key)?;
        Ok(fs::try_exists(full_path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = if prefix.trim_matches('/').is_empty() {
            self.base_path.clone()
        } else {
            self.full_path(prefix.trim_end_matches('/'))?
        };

        let mut keys = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_path) {
                    let key = relative
                        .components()
                        .filter_map(|c| c.as_os_str().to_str())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.write("7/docs/a.pdf", b"pdf-bytes").await.unwrap();
        assert!(backend.exists("7/docs/a.pdf").await.unwrap());
        assert_eq!(backend.read("7/docs/a.pdf").await.unwrap(), b"pdf-bytes");

        backend.delete("7/docs/a.pdf").await.unwrap();
        assert!(!backend.exists("7/docs/a.pdf").await.unwrap());
        // Deleting twice is fine.
        backend.delete("7/docs/a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(matches!(
            backend.read("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(matches!(
            backend.write("../outside", b"x").await,
            Err(Error::Storage(_))
        ));
        assert!(matches!(
            backend.read("7/../../etc/passwd").await,
            Err(Error::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_list_recurses_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.write("7/cases/.keep", b"").await.unwrap();
        backend.write("7/cases/x/1-a.pdf", b"a").await.unwrap();
        backend.write("7/other.png", b"b").await.unwrap();
        backend.write("8/cases/1-b.pdf", b"c").await.unwrap();

        let keys = backend.list("7/cases/").await.unwrap();
        assert_eq!(keys, vec!["7/cases/.keep", "7/cases/x/1-a.pdf"]);

        assert!(backend.list("9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.validate().await.unwrap();
        assert!(backend.list("").await.unwrap().is_empty());
    }
}
