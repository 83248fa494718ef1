//! Opens one SQLite database per tenant.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

use gauntlet_core::error::DomainError;
use gauntlet_core::ids::TenantId;
use gauntlet_core::repository::TenantStore;
use gauntlet_core::tenant::StoreOpener;

use crate::sqlite_tenant_store::SqliteTenantStore;

const FILE_PREFIX: &str = "clanbattles-";
const FILE_SUFFIX: &str = ".db";
const MAX_FILE_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where tenant databases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// One `clanbattles-{tenant}.db` file per tenant inside this directory.
    Directory(PathBuf),
    /// A private in-memory database per tenant, lost when the handle closes.
    InMemory,
}

/// `StoreOpener` creating SQLite tenant databases on first use.
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    location: StorageLocation,
}

impl SqliteStoreOpener {
    /// Creates an opener for `location`.
    #[must_use]
    pub fn new(location: StorageLocation) -> Self {
        Self { location }
    }

    /// Stores each tenant in its own file under `dir`.
    #[must_use]
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        Self::new(StorageLocation::Directory(dir.into()))
    }

    /// Keeps every tenant in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StorageLocation::InMemory)
    }

    /// The file holding `tenant_id`'s data, or `None` for in-memory storage.
    /// Copying or removing this file exports or removes the tenant.
    #[must_use]
    pub fn database_path(&self, tenant_id: &TenantId) -> Option<PathBuf> {
        match &self.location {
            StorageLocation::Directory(dir) => Some(database_file(dir, tenant_id)),
            StorageLocation::InMemory => None,
        }
    }

    async fn connect(&self, tenant_id: &TenantId) -> Result<SqlitePool, sqlx::Error> {
        match &self.location {
            StorageLocation::Directory(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                let options = SqliteConnectOptions::new()
                    .filename(database_file(dir, tenant_id))
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(BUSY_TIMEOUT);
                SqlitePoolOptions::new()
                    .max_connections(MAX_FILE_CONNECTIONS)
                    .connect_with(options)
                    .await
            }
            StorageLocation::InMemory => {
                // Each connection to `:memory:` is a separate database, so
                // the pool keeps exactly one connection alive for good.
                let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
            }
        }
    }
}

fn database_file(dir: &Path, tenant_id: &TenantId) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{tenant_id}{FILE_SUFFIX}"))
}

#[async_trait]
impl StoreOpener for SqliteStoreOpener {
    async fn open(&self, tenant_id: &TenantId) -> Result<Arc<dyn TenantStore>, DomainError> {
        let pool = self.connect(tenant_id).await.map_err(|e| {
            error!(tenant_id = %tenant_id, error = %e, "failed to open tenant database");
            DomainError::Infrastructure(format!("failed to open database for tenant {tenant_id}: {e}"))
        })?;
        let store = SqliteTenantStore::new(pool);
        store.bootstrap().await?;
        info!(
            tenant_id = %tenant_id,
            path = ?self.database_path(tenant_id),
            "tenant database ready"
        );
        Ok(Arc::new(store))
    }
}
