//! Storage gateway trait and its `MySQL` implementation.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{Row, mysql::MySqlRow};
use tracing::debug;

use crate::error::{DataError, Result};
use crate::model::{FilePaths, InstanceKey, LocationCode, PendingRecord};

const SELECT_PENDING: &str = r"
    SELECT CAST(ins.instance_key AS SIGNED) AS instance_key,
           CAST(ins.location_code AS SIGNED) AS location_code,
           CAST(ins.FileExist AS SIGNED) AS file_exist
    FROM instance ins
    WHERE ins.location_code = ?
      AND ins.FileExist != 2
    ORDER BY ins.instance_key ASC
    LIMIT ?
";

const SELECT_PATHS: &str = r"
    SELECT i.file_name, m.img_file_name
    FROM instance i
    LEFT JOIN image m ON i.instance_key = m.instance_key
    WHERE i.instance_key = ?
";

const MARK_PROCESSED: &str = r"UPDATE instance SET FileExist = 2 WHERE instance_key = ?";

const PING: &str = "SELECT 1";

/// Queries the reclaimer issues against the external tables.
///
/// Every call is an independent round-trip; no transaction spans them.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Select up to `limit` records at `location` whose flag is not `Done`, ascending by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    async fn fetch_pending(&self, location: LocationCode, limit: u32)
    -> Result<Vec<PendingRecord>>;

    /// Look up the primary and secondary relative paths for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] when no `instance` row matches.
    async fn fetch_paths(&self, key: InstanceKey) -> Result<FilePaths>;

    /// Set the record's flag to `Done`. Matching zero rows is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    async fn mark_processed(&self, key: InstanceKey) -> Result<()>;

    /// Connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn ping(&self) -> Result<()>;

    /// Release pooled connections.
    async fn close(&self) {}
}

/// Connection settings for [`MySqlGateway::connect`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Connection string.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long an operation waits for a free connection.
    pub acquire_timeout: Duration,
}

/// [`StorageGateway`] backed by a `sqlx` `MySQL` pool.
#[derive(Clone)]
pub struct MySqlGateway {
    pool: MySqlPool,
}

impl MySqlGateway {
    /// Build the pool and verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ConnectFailed`] when the pool cannot be established or the
    /// startup ping fails.
    pub async fn connect(options: &GatewayOptions) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(&options.url)
            .await
            .map_err(|source| DataError::ConnectFailed { source })?;
        let gateway = Self::from_pool(pool);
        gateway.ping().await.map_err(|err| match err {
            DataError::QueryFailed { source, .. } => DataError::ConnectFailed { source },
            other => other,
        })?;
        Ok(gateway)
    }

    /// Wrap an existing pool without probing it.
    #[must_use]
    pub const fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl StorageGateway for MySqlGateway {
    async fn fetch_pending(
        &self,
        location: LocationCode,
        limit: u32,
    ) -> Result<Vec<PendingRecord>> {
        let rows = sqlx::query(SELECT_PENDING)
            .bind(location.get())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DataError::query("fetch_pending", source))?;
        rows.iter().map(decode_pending).collect()
    }

    async fn fetch_paths(&self, key: InstanceKey) -> Result<FilePaths> {
        let row = sqlx::query(SELECT_PATHS)
            .bind(key.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::query("fetch_paths", source))?
            .ok_or(DataError::NotFound {
                operation: "fetch_paths",
                instance_key: key.get(),
            })?;

        let primary: Option<String> = row
            .try_get("file_name")
            .map_err(|source| DataError::query("fetch_paths", source))?;
        let secondary: Option<String> = row
            .try_get("img_file_name")
            .map_err(|source| DataError::query("fetch_paths", source))?;
        Ok(FilePaths::from_columns(primary, secondary))
    }

    async fn mark_processed(&self, key: InstanceKey) -> Result<()> {
        let result = sqlx::query(MARK_PROCESSED)
            .bind(key.get())
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::query("mark_processed", source))?;
        if result.rows_affected() == 0 {
            debug!(instance_key = key.get(), "flag update matched no changed rows");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query(PING)
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::query("ping", source))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_pending(row: &MySqlRow) -> Result<PendingRecord> {
    let key: i64 = row
        .try_get("instance_key")
        .map_err(|source| DataError::query("fetch_pending", source))?;
    let location_code: i64 = row
        .try_get("location_code")
        .map_err(|source| DataError::query("fetch_pending", source))?;
    let flag: Option<i64> = row
        .try_get("file_exist")
        .map_err(|source| DataError::query("fetch_pending", source))?;
    PendingRecord::from_columns(key, location_code, flag)
}
