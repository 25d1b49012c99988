use std::sync::Arc;

use crate::error::{DriftError, Result};
use crate::record;
use crate::store::StateStore;

/// Decides when a drift counter has crossed the escalation line.
///
/// The effective threshold for a key is whatever its record stores, falling
/// back to the engine-wide default when the record has none. The default is
/// injected at construction; this type never consults the environment.
pub struct ThresholdPolicy {
    store: Arc<dyn StateStore>,
    default_threshold: i64,
}

impl ThresholdPolicy {
    pub fn new(store: Arc<dyn StateStore>, default_threshold: i64) -> Self {
        Self {
            store,
            default_threshold,
        }
    }

    pub fn default_threshold(&self) -> i64 {
        self.default_threshold
    }

    /// Effective threshold for `key`. A stored value that does not parse as
    /// an integer is an error, not a silent fallback.
    pub async fn threshold(&self, key: &str) -> Result<i64> {
        match self
            .store
            .get_field(key, record::FIELD_DRIFT_THRESHOLD)
            .await?
        {
            Some(raw) if !raw.is_empty() => {
                raw.parse().map_err(|_| DriftError::InvalidThreshold(raw))
            }
            _ => Ok(self.default_threshold),
        }
    }

    /// True once `count` has reached the threshold for `key`. The comparison
    /// is inclusive, so a threshold of 1 escalates on the first count.
    pub async fn is_breached(&self, key: &str, count: i64) -> Result<bool> {
        Ok(count >= self.threshold(key).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn policy(default: i64) -> (Arc<MemoryStore>, ThresholdPolicy) {
        let store = Arc::new(MemoryStore::new());
        let policy = ThresholdPolicy::new(store.clone(), default);
        (store, policy)
    }

    #[tokio::test]
    async fn falls_back_to_default_when_nothing_is_stored() {
        let (_, policy) = policy(3);
        assert_eq!(policy.threshold("svc:prod").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_stored_value_falls_back_to_default() {
        let (store, policy) = policy(3);
        store
            .set_field("svc:prod", record::FIELD_DRIFT_THRESHOLD, "")
            .await
            .unwrap();
        assert_eq!(policy.threshold("svc:prod").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stored_value_overrides_default() {
        let (store, policy) = policy(3);
        store
            .set_field("svc:prod", record::FIELD_DRIFT_THRESHOLD, "7")
            .await
            .unwrap();
        assert_eq!(policy.threshold("svc:prod").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn unparseable_stored_value_is_an_error() {
        let (store, policy) = policy(3);
        store
            .set_field("svc:prod", record::FIELD_DRIFT_THRESHOLD, "weekly")
            .await
            .unwrap();
        let err = policy.threshold("svc:prod").await.unwrap_err();
        assert!(matches!(err, DriftError::InvalidThreshold(v) if v == "weekly"));
    }

    #[tokio::test]
    async fn breach_comparison_is_inclusive() {
        let (_, policy) = policy(3);
        assert!(!policy.is_breached("svc:prod", 2).await.unwrap());
        assert!(policy.is_breached("svc:prod", 3).await.unwrap());
        assert!(policy.is_breached("svc:prod", 4).await.unwrap());
    }
}
