// Credential acquisition for the sheet backend. The manager owns the
// token lifecycle (load -> refresh -> interactive authorize -> persist)
// but knows nothing about OAuth endpoints, browsers, or listeners; those
// live behind the AuthBroker port in the infra layer.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever the persisted credential layout changes. A stored file
/// with a different version is treated as corrupt and discarded.
pub const CREDENTIAL_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Token material authorizing calls to the sheet API, persisted as JSON
/// between runs so operators are not re-prompted on every restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub version: u32,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredCredential {
    /// Treats tokens within a minute of expiry as already expired so an
    /// in-flight sheet call does not outlive its token.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(60)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised while obtaining a credential.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Google client secret not found at {0}")]
    MissingClientSecret(String),

    #[error("Interactive authorization failed: {0}")]
    Broker(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Token store error: {0}")]
    Store(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Persistence for the single credential this service holds.
///
/// `load` returns `None` both when nothing was ever stored and when the
/// stored file is corrupt (implementations discard corrupt files).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredCredential>, AuthError>;
    async fn save(&self, credential: &StoredCredential) -> Result<(), AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// The authorization broker: an external collaborator that can mint
/// credentials. `authorize` is interactive (the operator completes a
/// browser redirect) and blocks until it succeeds or fails as a unit.
#[async_trait]
pub trait AuthBroker: Send + Sync {
    async fn authorize(&self) -> Result<StoredCredential, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredential, AuthError>;
}

// ============================================================================
// SERVICE
// ============================================================================

/// Obtains a valid credential, refreshing or re-authorizing as needed.
///
/// Called once per HTTP request; there is no in-process cache across
/// requests. Concurrent requests racing to refresh both write the store
/// (last write wins) - an accepted race, not guarded by locking.
pub struct CredentialManager<T: TokenStore, B: AuthBroker> {
    store: T,
    broker: B,
}

impl<T: TokenStore, B: AuthBroker> CredentialManager<T, B> {
    pub fn new(store: T, broker: B) -> Self {
        Self { store, broker }
    }

    /// Returns a credential that is valid right now, persisting any newly
    /// minted one before returning it.
    pub async fn acquire(&self) -> Result<StoredCredential, AuthError> {
        self.acquire_at(Utc::now()).await
    }

    async fn acquire_at(&self, now: DateTime<Utc>) -> Result<StoredCredential, AuthError> {
        if let Some(credential) = self.store.load().await? {
            if !credential.is_expired(now) {
                return Ok(credential);
            }

            if let Some(refresh_token) = credential.refresh_token.as_deref() {
                match self.broker.refresh(refresh_token).await {
                    Ok(refreshed) => {
                        self.store.save(&refreshed).await?;
                        tracing::info!("Refreshed expired credential");
                        return Ok(refreshed);
                    }
                    Err(err) => {
                        // Refresh token rejected; drop it and start over
                        // with a full interactive authorization.
                        tracing::warn!("Credential refresh failed, re-authorizing: {}", err);
                        self.store.clear().await?;
                    }
                }
            }
        }

        let fresh = self.broker.authorize().await?;
        self.store.save(&fresh).await?;
        tracing::info!("Persisted credential from interactive authorization");
        Ok(fresh)
    }
}
