//! SQLite storage for the clan battle tracker.
//!
//! Every tenant gets its own database, so a tenant's data can be exported or
//! removed as one file.

pub mod schema;
pub mod sqlite_store_opener;
pub mod sqlite_tenant_store;

pub use sqlite_store_opener::{SqliteStoreOpener, StorageLocation};
pub use sqlite_tenant_store::SqliteTenantStore;
