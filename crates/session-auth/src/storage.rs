//! Durable key-value storage for credential entries
//!
//! `Storage` is the seam between the credential store and the physical
//! persistence layer. Operations are atomic per key; there are no cross-key
//! transactions, so a reader can observe the access token updated before the
//! refresh token.
//!
//! `FileStorage` keeps a JSON object on disk and rewrites it atomically
//! (temp file + rename) on every mutation. `MemoryStorage` is the
//! non-durable variant for tests and throwaway sessions.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Boxed future returned by `Storage` operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Per-key string storage.
///
/// Uses `Pin<Box<dyn Future>>` return types so it can be held as `Arc<dyn Storage>`.
pub trait Storage: Send + Sync {
    /// Backend label for logging (e.g. "file", "memory")
    fn kind(&self) -> &'static str;

    /// Read a value. `Ok(None)` when the key has never been written.
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>>;

    /// Write a value, replacing any previous one.
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StorageFuture<'a, ()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;
}

/// JSON file backed storage.
///
/// The whole file is loaded at construction. The Mutex serializes writers so
/// two concurrent `set` calls can't interleave their temp-file renames.
pub struct FileStorage {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Load entries from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}`.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded credential file");
            entries
        } else {
            info!(path = %path.display(), "credential file not found, starting empty");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            // Only commit to memory once the file write has landed
            let mut next = state.clone();
            next.insert(key.to_owned(), value.to_owned());
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(key, "stored entry");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if !state.contains_key(key) {
                return Ok(());
            }
            let mut next = state.clone();
            next.remove(key);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(key, "removed entry");
            Ok(())
        })
    }
}

/// In-process storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.state.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            self.state
                .write()
                .await
                .insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            self.state.write().await.remove(key);
            Ok(())
        })
    }
}

/// Write entries to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 since the file holds tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("credentials");

    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn file_entries_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::load(path.clone()).await.unwrap();
        storage.set("access_token", "tok-1").await.unwrap();
        storage.set("refresh_token", "ref-1").await.unwrap();

        let reloaded = FileStorage::load(path).await.unwrap();
        assert_eq!(
            reloaded.get("access_token").await.unwrap().as_deref(),
            Some("tok-1")
        );
        assert_eq!(
            reloaded.get("refresh_token").await.unwrap().as_deref(),
            Some("ref-1")
        );
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        assert!(!path.exists());
        let storage = FileStorage::load(path.clone()).await.unwrap();
        assert!(path.exists());
        assert!(storage.get("access_token").await.unwrap().is_none());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "not json {{").await.unwrap();

        let result = FileStorage::load(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::load(path.clone()).await.unwrap();
        storage.set("access_token", "tok-1").await.unwrap();
        storage.remove("access_token").await.unwrap();
        storage.remove("access_token").await.unwrap();
        storage.remove("never-written").await.unwrap();

        let reloaded = FileStorage::load(path).await.unwrap();
        assert!(reloaded.get("access_token").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::load(path.clone()).await.unwrap();
        storage.set("access_token", "tok-1").await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_writes_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = Arc::new(FileStorage::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .set(&format!("key-{i}"), &format!("value-{i}"))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 10);
    }

    #[tokio::test]
    async fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get("k").await.unwrap().is_none());
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
        storage.remove("k").await.unwrap();
        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
        assert_eq!(storage.kind(), "memory");
    }
}
