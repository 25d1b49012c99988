use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{DriftError, Result};
use crate::record;
use crate::store::StateStore;

/// In-memory `StateStore` used as a test double and for driving the router
/// in integration tests. Mirrors the Redis hash semantics, including the
/// counter starting from zero when the field is absent.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct record snapshot for assertions.
    pub async fn snapshot(&self, key: &str) -> Option<HashMap<String, String>> {
        self.records.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn initialize_if_absent(
        &self,
        key: &str,
        tier: &str,
        project_id: &str,
        threshold: &str,
    ) -> Result<bool> {
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(false);
        }
        let mut record = HashMap::new();
        record.insert(
            record::FIELD_DRIFT_THRESHOLD.to_string(),
            threshold.to_string(),
        );
        record.insert(record::FIELD_ENVIRONMENT_TIER.to_string(), tier.to_string());
        record.insert(record::FIELD_PROJECT_ID.to_string(), project_id.to_string());
        record.insert(record::FIELD_DRIFT_INCREMENT.to_string(), "0".to_string());
        records.insert(key.to_string(), record);
        Ok(true)
    }

    async fn record_operation(&self, key: &str, timestamp: &str, operation: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        records
            .entry(key.to_string())
            .or_default()
            .insert(record::FIELD_LOG.to_string(), record::log_entry(timestamp, operation));
        Ok(())
    }

    async fn increment_drift(&self, key: &str) -> Result<i64> {
        let mut records = self.records.lock().await;
        let record = records.entry(key.to_string()).or_default();
        let current: i64 = record
            .get(record::FIELD_DRIFT_INCREMENT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let next = current + 1;
        record.insert(record::FIELD_DRIFT_INCREMENT.to_string(), next.to_string());
        Ok(next)
    }

    async fn reset_drift(&self, key: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        records
            .entry(key.to_string())
            .or_default()
            .insert(record::FIELD_DRIFT_INCREMENT.to_string(), "0".to_string());
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let records = self.records.lock().await;
        match records.get(key) {
            Some(record) if !record.is_empty() => Ok(record.clone()),
            _ => Err(DriftError::NotFound(key.to_string())),
        }
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        records
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let records = self.records.lock().await;
        Ok(records.get(key).and_then(|record| record.get(field).cloned()))
    }

    async fn store_plan_output(&self, key: &str, output: &str) -> Result<()> {
        self.set_field(key, record::FIELD_PLAN_OUTPUT, output).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
