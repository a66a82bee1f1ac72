//! TOML configuration for the `paye` binary.
//!
//! ```toml
//! log_level = "debug"
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "paye.db"
//!
//! [defaults]
//! country = "Namibia"
//! tax_year = "2025"
//! age = 30
//! medical_aid_members = 0
//! ```
//!
//! Every key is optional. Command-line flags win over file values.

use std::path::Path;

use anyhow::{Context, Result};
use paye_core::TaxpayerProfile;
use paye_core::db::DbConfig;
use serde::Deserialize;
use tracing::info;

/// Backend name that serves the schedules compiled into the engine.
pub const BUILTIN_BACKEND: &str = "builtin";

/// Backend chosen when `--db` is given without `--backend` and the
/// configuration names no database.
pub const DEFAULT_DB_BACKEND: &str = "sqlite";

/// Environment variable naming a config file when `--config` is omitted.
pub const CONFIG_ENV: &str = "PAYE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// EnvFilter directive applied after startup; `RUST_LOG` wins when set.
    pub log_level: Option<String>,
    pub database: DbConfig,
    pub defaults: Defaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            database: DbConfig {
                backend: BUILTIN_BACKEND.to_string(),
                connection_string: "paye.db".to_string(),
            },
            defaults: Defaults::default(),
        }
    }
}

/// Jurisdiction and taxpayer details used when a command does not name them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub country: String,
    pub tax_year: String,
    pub age: u32,
    pub medical_aid_members: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            country: "South Africa".to_string(),
            tax_year: "2025".to_string(),
            age: TaxpayerProfile::DEFAULT_AGE,
            medical_aid_members: 0,
        }
    }
}

impl Defaults {
    pub fn profile(&self) -> TaxpayerProfile {
        TaxpayerProfile::new(self.age, self.medical_aid_members)
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies `--backend` / `--db` on top of the file values.
    ///
    /// `--db` alone on the builtin backend switches to
    /// [`DEFAULT_DB_BACKEND`].
    pub fn override_database(
        &mut self,
        backend: Option<String>,
        connection_string: Option<String>,
    ) {
        match backend {
            Some(backend) => self.database.backend = backend,
            None if connection_string.is_some() && self.database.backend == BUILTIN_BACKEND => {
                info!(backend = DEFAULT_DB_BACKEND, "--db given without --backend");
                self.database.backend = DEFAULT_DB_BACKEND.to_string();
            }
            None => {}
        }
        if let Some(connection_string) = connection_string {
            self.database.connection_string = connection_string;
        }
    }
}
