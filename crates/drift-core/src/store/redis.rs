use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::time::timeout;

use crate::error::{DriftError, Result};
use crate::record;
use crate::store::StateStore;

/// Redis-backed `StateStore`. Each `repository:environment` key maps to one
/// hash whose fields are the constants in [`crate::record`].
///
/// The multiplexed connection is cheap to clone and safe to share across
/// tasks; every command runs under `op_timeout` so a wedged Redis surfaces
/// as `StoreUnavailable` instead of hanging the caller.
pub struct RedisStore {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisStore {
    /// Per-command timeout used when the caller has no override.
    pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Connect to the Redis instance at `url`, e.g. `redis://localhost:6379/0`.
    /// Fails fast when the instance is unreachable.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                DriftError::StoreUnavailable(format!(
                    "connection attempt timed out after {op_timeout:?}"
                ))
            })??;
        Ok(Self { conn, op_timeout })
    }

    async fn run<T>(
        &self,
        fut: impl Future<Output = redis::RedisResult<T>> + Send,
    ) -> Result<T> {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DriftError::StoreUnavailable(format!(
                "operation timed out after {:?}",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn initialize_if_absent(
        &self,
        key: &str,
        tier: &str,
        project_id: &str,
        threshold: &str,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = self.run(conn.exists(key)).await?;
        if exists {
            tracing::debug!(key, "drift record already initialized");
            return Ok(false);
        }
        let fields = [
            (record::FIELD_DRIFT_THRESHOLD, threshold),
            (record::FIELD_ENVIRONMENT_TIER, tier),
            (record::FIELD_PROJECT_ID, project_id),
            (record::FIELD_DRIFT_INCREMENT, "0"),
        ];
        let _: () = self.run(conn.hset_multiple(key, &fields)).await?;
        tracing::info!(key, "initialized drift record");
        Ok(true)
    }

    async fn record_operation(&self, key: &str, timestamp: &str, operation: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let entry = record::log_entry(timestamp, operation);
        let _: () = self.run(conn.hset(key, record::FIELD_LOG, entry)).await?;
        Ok(())
    }

    async fn increment_drift(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .run(conn.hincr(key, record::FIELD_DRIFT_INCREMENT, 1_i64))
            .await?;
        Ok(count)
    }

    async fn reset_drift(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = self
            .run(conn.hset(key, record::FIELD_DRIFT_INCREMENT, "0"))
            .await?;
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let record: HashMap<String, String> = self.run(conn.hgetall(key)).await?;
        // HGETALL on a missing key yields an empty map, not an error.
        if record.is_empty() {
            return Err(DriftError::NotFound(key.to_string()));
        }
        Ok(record)
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = self.run(conn.hset(key, field, value)).await?;
        Ok(())
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self.run(conn.hget(key, field)).await?;
        Ok(value)
    }

    async fn store_plan_output(&self, key: &str, output: &str) -> Result<()> {
        self.set_field(key, record::FIELD_PLAN_OUTPUT, output).await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = self.run(redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }
}
