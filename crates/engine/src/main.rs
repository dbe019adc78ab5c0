//! Catalog Engine - operator entry point.
//!
//! Opens the configured category store, optionally rewrites stale levels,
//! then audits the whole tree and logs the report.

use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_engine::infrastructure::config::{AppConfig, StoreBackend};
use catalog_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root, then the working directory.
    load_dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Catalog Engine");

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if config.store == StoreBackend::Sqlite {
        if let Some(dir) = Path::new(&config.db_path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create database directory {}", dir.display())
                })?;
            }
        }
    }

    let app = App::from_config(&config)
        .await
        .context("Failed to open category store")?;

    if config.repair_levels {
        let repaired = app
            .catalog
            .repair_levels()
            .await
            .context("Failed to repair category levels")?;
        tracing::info!(repaired, "Level repair finished");
    }

    let report = app.catalog.audit().await.context("Failed to audit categories")?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize audit")?;

    if report.is_healthy() {
        tracing::info!(total = report.total, "Category tree is healthy");
    } else {
        tracing::warn!(total = report.total, "Category tree needs attention");
    }
    tracing::info!(report = %json, "Audit report");

    Ok(())
}

fn load_dotenv() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
    let _ = dotenvy::dotenv();
}
