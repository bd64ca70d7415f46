use anyhow::Context;
use coredepot_core::registry::discover_from_config;
use coredepot_core::{AppConfig, AssetSync, DirectorySource};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: coredepot <config.json> [version]";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,coredepot_core=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().context(USAGE)?);
    let version: u32 = match args.next() {
        Some(v) => v.parse().with_context(|| format!("invalid version {v:?}"))?,
        None => env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>()? * 10_000
            + env!("CARGO_PKG_VERSION_MINOR").parse::<u32>()? * 100
            + env!("CARGO_PKG_VERSION_PATCH").parse::<u32>()?,
    };

    let config = AppConfig::load(&config_path)?;

    let source = DirectorySource::new(config.sync.bundle_dir.clone());
    let sync = AssetSync::new(source, config.sync.clone(), version).run();

    let cores = match discover_from_config(&config.discovery) {
        Ok(report) => {
            for issue in &report.issues {
                tracing::debug!(?issue, "Discovery issue");
            }
            report.cores
        }
        Err(e) => {
            tracing::error!(error = %e, "Core discovery failed");
            Vec::new()
        }
    };

    let out = serde_json::json!({
        "sync": sync,
        "cores": cores,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(())
}
