// In-memory doubles for the auth ports. These keep HTTP-level tests from
// touching the filesystem or Google's endpoints.
#![allow(dead_code)]

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::auth::{AuthBroker, AuthError, StoredCredential, TokenStore};

/// Token store backed by a single in-memory slot.
pub struct MemoryTokenStore {
    slot: RwLock<Option<StoredCredential>>,
}

impl MemoryTokenStore {
    pub fn empty() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn holding(credential: StoredCredential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<StoredCredential>, AuthError> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, credential: &StoredCredential) -> Result<(), AuthError> {
        *self.slot.write().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Broker double that either hands out a fixed credential or fails every
/// call with a fixed message.
pub struct StaticBroker {
    outcome: Result<StoredCredential, String>,
}

impl StaticBroker {
    pub fn issuing(credential: StoredCredential) -> Self {
        Self {
            outcome: Ok(credential),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
        }
    }
}

#[async_trait]
impl AuthBroker for StaticBroker {
    async fn authorize(&self) -> Result<StoredCredential, AuthError> {
        match &self.outcome {
            Ok(credential) => Ok(credential.clone()),
            Err(message) => Err(AuthError::Broker(message.clone())),
        }
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<StoredCredential, AuthError> {
        match &self.outcome {
            Ok(credential) => Ok(credential.clone()),
            Err(message) => Err(AuthError::Refresh(message.clone())),
        }
    }
}
