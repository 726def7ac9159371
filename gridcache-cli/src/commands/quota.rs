//! Cache scanning and quota enforcement.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use gridcache::config::ConfigFile;
use gridcache::grid::GridSetBroker;
use gridcache::quota::{DiskQuotaService, LayerReport};
use gridcache::storage::{FileTileStore, TilePathGenerator};
use tracing::info;

use super::common::{init_logging, load_config, runtime};
use crate::error::CliError;

/// Arguments for the `scan` command.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Ignore persisted usage and rescan every layer from disk
    #[arg(long)]
    pub full: bool,
}

/// Run the `scan` command: register the configured layers, wait for their
/// scans and print the usage of each.
pub fn run_scan(args: ScanArgs, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let _logging = init_logging(&config)?;

    runtime()?.block_on(async {
        let service = start_service(&config)?;
        service.wait_for_scans().await;

        if args.full {
            for layer in service.layer_names() {
                service.rescan(&layer)?;
            }
            service.wait_for_scans().await;
        }

        let reports = service.report().await?;
        print_reports(&reports);
        service.shutdown().await?;
        Ok::<(), CliError>(())
    })
}

/// Run the `evict` command: one eviction pass over every layer.
pub fn run_evict(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let _logging = init_logging(&config)?;

    runtime()?.block_on(async {
        let service = start_service(&config)?;
        service.wait_for_scans().await;

        let results = service.evict_over_quota().await;
        if results.is_empty() {
            println!("All layers are within their quota.");
        }
        for result in &results {
            println!(
                "{}: deleted {} tiles, {} -> {}",
                result.layer,
                result.files_deleted,
                result.size_before.nice(),
                result.size_after.nice()
            );
        }

        service.shutdown().await?;
        Ok::<(), CliError>(())
    })
}

fn start_service(config: &ConfigFile) -> Result<DiskQuotaService, CliError> {
    if config.layers.is_empty() {
        return Err(CliError::InvalidArgument(
            "no [layer.NAME] sections in the configuration".to_string(),
        ));
    }

    info!(layers = config.layers.len(), "Starting disk quota service");
    let settings = config.disk_quota.clone();
    let tiles = Arc::new(FileTileStore::new(TilePathGenerator::new(
        &settings.cache_dir,
    )));
    let service = DiskQuotaService::start(settings, Arc::new(GridSetBroker::new()?), tiles)?;
    service.register_configured(&config.layers)?;
    Ok(service)
}

fn print_reports(reports: &[LayerReport]) {
    println!(
        "{:<24} {:<6} {:>14} {:>14} {:>10}",
        "Layer", "Policy", "Used", "Limit", "Tiles"
    );
    for report in reports {
        let limit = report
            .limit
            .map_or_else(|| "unlimited".to_string(), |limit| limit.to_string());
        println!(
            "{:<24} {:<6} {:>14} {:>14} {:>10}{}",
            report.layer,
            report.policy.name(),
            report.used.nice().to_string(),
            limit,
            report.tiles,
            if report.is_over_quota() { "  over quota" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_service_registers_configured_layers() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("cache");
        let path = temp_dir.path().join("config.ini");
        std::fs::write(
            &path,
            format!(
                "[disk_quota]\ncache_dir = {}\n\n[layer.roads]\npolicy = LFU\nquota = 1MB\n",
                cache_dir.display()
            ),
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        let service = start_service(&config).unwrap();
        service.wait_for_scans().await;
        let reports = service.report().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].layer, "roads");
        assert_eq!(reports[0].limit.map(|l| l.to_string()), Some("1 MiB".to_string()));
        assert!(!reports[0].is_over_quota());

        service.shutdown().await.unwrap();
        assert!(cache_dir.join("quota.ini").exists());
    }

    #[test]
    fn test_no_layers_is_error() {
        assert!(matches!(
            start_service(&ConfigFile::default()),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
