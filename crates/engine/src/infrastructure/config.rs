//! Application configuration

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Where category records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown store backend '{}', expected 'sqlite' or 'memory'", other),
        }
    }
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Category store backend: "sqlite" or "memory"
    pub store: StoreBackend,
    /// SQLite database path (if using sqlite backend)
    pub db_path: String,
    /// Recompute stale levels before auditing
    pub repair_levels: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = lookup("CATALOG_STORE")
            .unwrap_or_else(|| "sqlite".to_string())
            .parse::<StoreBackend>()
            .context("CATALOG_STORE must be 'sqlite' or 'memory'")?;

        let repair_levels = match lookup("CATALOG_REPAIR_LEVELS") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("CATALOG_REPAIR_LEVELS must be a boolean, got '{}'", raw))?,
            None => false,
        };

        Ok(Self {
            store,
            db_path: lookup("CATALOG_DB_PATH").unwrap_or_else(|| "./data/catalog.db".to_string()),
            repair_levels,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => bail!("not a boolean"),
    }
}
