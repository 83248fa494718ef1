//! Tenant store router.
//!
//! Maps a tenant id to its [`TenantHandle`]: one storage unit plus the
//! exclusive update lock guarding it. Handles are opened lazily on first use,
//! cached for the life of the process and closed by [`TenantRouter::close_all`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{MutexGuard, OnceCell};
use tracing::{debug, info};

use crate::error::DomainError;
use crate::ids::{MemberId, TenantId};
use crate::repository::{Roster, TenantStore};

/// Opens the isolated storage unit of a tenant, creating it on first use.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    /// Opens (or creates) the store for `tenant_id`.
    async fn open(&self, tenant_id: &TenantId) -> Result<Arc<dyn TenantStore>, DomainError>;
}

/// A tenant's storage handle and its exclusive update lock.
pub struct TenantHandle {
    tenant_id: TenantId,
    store: Arc<dyn TenantStore>,
    update_lock: tokio::sync::Mutex<()>,
}

impl TenantHandle {
    /// Wraps an opened store.
    #[must_use]
    pub fn new(tenant_id: TenantId, store: Arc<dyn TenantStore>) -> Self {
        Self {
            tenant_id,
            store,
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The tenant this handle belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// The tenant's storage.
    #[must_use]
    pub fn store(&self) -> &dyn TenantStore {
        self.store.as_ref()
    }

    /// Acquires the tenant's exclusive update lock. Every read-modify-write
    /// of the battle state or the ledger must hold the returned guard for its
    /// whole span; dropping the guard releases the lock.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.update_lock.lock().await
    }
}

impl std::fmt::Debug for TenantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantHandle")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

type HandleCell = Arc<OnceCell<Arc<TenantHandle>>>;

/// Caches one [`TenantHandle`] per tenant.
///
/// The cache map is only held long enough to find or insert the tenant's
/// cell; opening happens outside it, so first-time opens for different
/// tenants run in parallel while concurrent first-time opens for the same
/// tenant wait on the same cell and observe a single open.
pub struct TenantRouter {
    opener: Arc<dyn StoreOpener>,
    handles: Mutex<HashMap<TenantId, HandleCell>>,
}

impl TenantRouter {
    /// Creates a router backed by `opener`.
    #[must_use]
    pub fn new(opener: Arc<dyn StoreOpener>) -> Self {
        Self {
            opener,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached handle for `tenant_id`, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns the opener's error if the store cannot be opened. A failed
    /// open is not cached; the next call tries again.
    pub async fn handle_for(&self, tenant_id: &TenantId) -> Result<Arc<TenantHandle>, DomainError> {
        let cell = self.cell_for(tenant_id)?;
        let handle = cell
            .get_or_try_init(|| async {
                let store = self.opener.open(tenant_id).await?;
                info!(tenant_id = %tenant_id, "opened tenant store");
                Ok::<_, DomainError>(Arc::new(TenantHandle::new(tenant_id.clone(), store)))
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    /// Number of tenants with an open handle.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the cache lock is poisoned.
    pub fn open_count(&self) -> Result<usize, DomainError> {
        let handles = self.lock_handles()?;
        Ok(handles.values().filter(|cell| cell.initialized()).count())
    }

    /// Every handle opened so far. Tenants still opening are skipped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the cache lock is poisoned.
    pub fn open_handles(&self) -> Result<Vec<Arc<TenantHandle>>, DomainError> {
        let handles = self.lock_handles()?;
        Ok(handles.values().filter_map(|cell| cell.get().cloned()).collect())
    }

    /// Closes and forgets every cached handle.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the cache lock is poisoned.
    pub async fn close_all(&self) -> Result<(), DomainError> {
        let drained: Vec<(TenantId, HandleCell)> = self.lock_handles()?.drain().collect();
        for (tenant_id, cell) in drained {
            if let Some(handle) = cell.get() {
                // Wait out any in-flight mutation before closing.
                let _guard = handle.lock().await;
                handle.store().close().await;
                debug!(tenant_id = %tenant_id, "closed tenant store");
            }
        }
        info!("closed all tenant stores");
        Ok(())
    }

    fn cell_for(&self, tenant_id: &TenantId) -> Result<HandleCell, DomainError> {
        let mut handles = self.lock_handles()?;
        Ok(Arc::clone(handles.entry(tenant_id.clone()).or_default()))
    }

    fn lock_handles(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<TenantId, HandleCell>>, DomainError> {
        self.handles
            .lock()
            .map_err(|_| DomainError::Infrastructure("tenant handle cache poisoned".into()))
    }
}

impl std::fmt::Debug for TenantRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRouter").finish_non_exhaustive()
    }
}

/// Roster checks answered from the tenant's own store.
#[async_trait]
impl Roster for TenantRouter {
    async fn member_exists(
        &self,
        tenant_id: &TenantId,
        member_id: &MemberId,
    ) -> Result<bool, DomainError> {
        let handle = self.handle_for(tenant_id).await?;
        handle.store().member_exists(member_id).await
    }
}
