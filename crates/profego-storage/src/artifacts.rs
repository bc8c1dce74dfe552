//! Tier-aware artifact store.
//!
//! Maps `(user, logical filename, tier)` onto raw storage keys. This is the only
//! storage surface the ingestion pipeline and the HTTP handlers talk to.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use profego_core::{size_mb, Tier};
use serde::Serialize;
use utoipa::ToSchema;

use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub key: String,
    pub name: String,
    pub tier: Tier,
    pub size_bytes: u64,
}

/// One artifact as seen by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSummary {
    pub name: String,
    pub tier: Tier,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

impl ArtifactSummary {
    pub fn size_mb(&self) -> f64 {
        size_mb(self.size_bytes)
    }

    /// Modification time as `YYYY-MM-DD HH:MM` (UTC).
    pub fn date(&self) -> String {
        self.last_modified.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Object count and volume of one tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct TierUsage {
    pub files: usize,
    pub size_bytes: u64,
    pub size_mb: f64,
}

impl TierUsage {
    fn from_summaries(items: &[ArtifactSummary]) -> Self {
        let size_bytes = items.iter().map(|a| a.size_bytes).sum();
        Self {
            files: items.len(),
            size_bytes,
            size_mb: size_mb(size_bytes),
        }
    }
}

/// Storage consumption of one user.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserUsage {
    pub email: String,
    pub original: TierUsage,
    pub processed: TierUsage,
    pub total_files: usize,
    pub total_size_mb: f64,
}

#[derive(Clone)]
pub struct ArtifactStore {
    storage: Arc<dyn Storage>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        self.storage.health_check().await
    }

    /// Store an artifact. An existing artifact with the same name and tier is replaced.
    pub async fn put(
        &self,
        user: &str,
        name: &str,
        data: Bytes,
        tier: Tier,
    ) -> StorageResult<StoredArtifact> {
        let key = keys::artifact_key(user, tier, name)?;
        let size_bytes = data.len() as u64;
        self.storage.put(&key, data).await?;
        Ok(StoredArtifact {
            key,
            name: name.to_string(),
            tier,
            size_bytes,
        })
    }

    /// Fetch an artifact. `Ok(None)` when it does not exist.
    pub async fn get(&self, user: &str, name: &str, tier: Tier) -> StorageResult<Option<Bytes>> {
        let key = keys::artifact_key(user, tier, name)?;
        match self.storage.get(&key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List one tier of a user's artifacts.
    ///
    /// The order is the backend's and carries no meaning.
    pub async fn list(&self, user: &str, tier: Tier) -> StorageResult<Vec<ArtifactSummary>> {
        let prefix = keys::tier_prefix(user, tier)?;
        let objects = self.storage.list(&prefix).await?;
        Ok(objects
            .into_iter()
            .filter(|meta| {
                // Only direct children of the tier folder are artifacts.
                meta.key
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|meta| ArtifactSummary {
                name: meta.name().to_string(),
                tier,
                size_bytes: meta.size_bytes,
                last_modified: meta.last_modified,
            })
            .collect())
    }

    /// Delete an artifact. Missing artifacts yield [`StorageError::NotFound`].
    pub async fn delete(&self, user: &str, name: &str, tier: Tier) -> StorageResult<()> {
        let key = keys::artifact_key(user, tier, name)?;
        self.storage.delete(&key).await
    }

    /// Prepare a user's namespace so both tiers can receive artifacts.
    pub async fn init_user(&self, user: &str) -> StorageResult<()> {
        for tier in Tier::ALL {
            let prefix = keys::tier_prefix(user, tier)?;
            self.storage.ensure_prefix(&prefix).await?;
        }
        tracing::debug!(user = %user, "User storage namespace ready");
        Ok(())
    }

    /// Count and size of a user's artifacts per tier.
    pub async fn usage(&self, user: &str) -> StorageResult<UserUsage> {
        let original = TierUsage::from_summaries(&self.list(user, Tier::Original).await?);
        let processed = TierUsage::from_summaries(&self.list(user, Tier::Processed).await?);
        let total_files = original.files + processed.files;
        let total_size_mb = size_mb(original.size_bytes + processed.size_bytes);
        Ok(UserUsage {
            email: user.to_string(),
            original,
            processed,
            total_files,
            total_size_mb,
        })
    }
}
