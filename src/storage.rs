use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{AppError, Result};

/// Repositories the app has been installed on, persisted as a JSON array.
pub struct InstallationStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl InstallationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded repositories, in insertion order.
    pub async fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Record `repository`. Returns `false` if it was already there.
    pub async fn insert(&self, repository: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut repositories = self.read().await?;
        if repositories.iter().any(|r| r == repository) {
            return Ok(false);
        }
        repositories.push(repository.to_string());
        self.write(&repositories).await?;
        Ok(true)
    }

    async fn read(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                AppError::Storage(format!("{} is not a JSON array: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, repositories: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(repositories)?;
        // Replace atomically.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_is_idempotent_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/installations.json");
        let store = InstallationStore::new(&path);

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.insert("alice/widgets").await.unwrap());
        assert!(store.insert("bob/gadgets").await.unwrap());
        assert!(!store.insert("alice/widgets").await.unwrap());

        let reopened = InstallationStore::new(&path);
        assert_eq!(
            reopened.list().await.unwrap(),
            vec!["alice/widgets", "bob/gadgets"]
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installations.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = InstallationStore::new(&path);
        assert!(matches!(store.list().await, Err(AppError::Storage(_))));
    }
}
