use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::core::auth::{AuthError, StoredCredential, TokenStore, CREDENTIAL_SCHEMA_VERSION};

/// File-backed token store. The credential is kept as pretty-printed JSON
/// at a fixed path; a schema version field guards against stale layouts.
///
/// Concurrent requests can race to rewrite the file; last write wins and
/// the file always holds one complete credential.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<StoredCredential>, AuthError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Store(err.to_string())),
        };

        match serde_json::from_str::<StoredCredential>(&raw) {
            Ok(credential) if credential.version == CREDENTIAL_SCHEMA_VERSION => {
                tracing::info!(path = %self.path.display(), "Loaded stored credential");
                Ok(Some(credential))
            }
            Ok(credential) => {
                tracing::warn!(
                    found = credential.version,
                    expected = CREDENTIAL_SCHEMA_VERSION,
                    "Stored credential has wrong schema version, discarding"
                );
                self.clear().await?;
                Ok(None)
            }
            Err(err) => {
                tracing::warn!("Stored credential is corrupt, discarding: {}", err);
                self.clear().await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, credential: &StoredCredential) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(credential)
            .map_err(|err| AuthError::Store(err.to_string()))?;
        fs::write(&self.path, json)
            .await
            .map_err(|err| AuthError::Store(err.to_string()))?;
        tracing::info!(path = %self.path.display(), "Saved credential");
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Store(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn store_in(dir: &tempfile::TempDir) -> FileTokenStore {
        FileTokenStore::new(dir.path().join("token.json"))
    }

    fn sample_credential() -> StoredCredential {
        StoredCredential {
            version: CREDENTIAL_SCHEMA_VERSION,
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn load_on_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let credential = sample_credential();

        store.save(&credential).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, credential);
    }

    #[tokio::test]
    async fn corrupt_file_is_discarded_and_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = FileTokenStore::new(&path);

        assert!(store.load().await.unwrap().is_none());
        // The corrupt file is gone, not just ignored.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn wrong_schema_version_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut credential = sample_credential();
        credential.version = CREDENTIAL_SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&credential).unwrap()).unwrap();
        let store = FileTokenStore::new(&path);

        assert!(store.load().await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.clear().await.unwrap();
        store.save(&sample_credential()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }
}
