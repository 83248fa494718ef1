//! Server configuration read from the environment.

use std::path::PathBuf;

use gauntlet_battle::domain::boss_table::BossTable;
use gauntlet_core::error::DomainError;

use crate::error::AppError;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BOSS_DATA: &str = "data/boss_data.yaml";
const DEFAULT_REGION: &str = "pcr_jp";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// Where the boss table is read from. Kept in the app state so the table can
/// be reloaded while the server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossTableSource {
    /// Path of the YAML boss data file.
    pub path: PathBuf,
    /// Server region section to read.
    pub region: String,
}

impl BossTableSource {
    /// Reads and validates the table.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the file is unreadable or invalid.
    pub fn load(&self) -> Result<BossTable, DomainError> {
        BossTable::load(&self.path, &self.region)
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one database per tenant.
    pub data_dir: PathBuf,
    /// Boss table location.
    pub boss_table: BossTableSource,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Config {
    /// Reads `GAUNTLET_DATA_DIR`, `GAUNTLET_BOSS_DATA`, `GAUNTLET_REGION`,
    /// `HOST` and `PORT`, falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `PORT` is not a valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            data_dir: lookup("GAUNTLET_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            boss_table: BossTableSource {
                path: lookup("GAUNTLET_BOSS_DATA")
                    .map_or_else(|| PathBuf::from(DEFAULT_BOSS_DATA), PathBuf::from),
                region: lookup("GAUNTLET_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            },
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }
}
