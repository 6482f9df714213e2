//! NAMASTE to ICD-11 TM2 mapping runner.
//!
//! Loads the catalogs, recomputes the mappings, persists and exports them,
//! then resolves any codes given on the command line.

use std::path::{Path, PathBuf};

use ayush_loader::{
    discover_catalog_files, export_mappings_csv, export_sample_csv, CatalogStore, MapperConfig,
    MappingStore, MappingSummary, ResolvedMapping,
};
use ayush_service::MappingService;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATA_PATH: &str = "data";
const DEFAULT_MAPPINGS_PATH: &str = "db/concept_map.csv";
const DEFAULT_EXPORT_DIR: &str = "output";
const SAMPLE_PER_PREFIX: usize = 10;

#[derive(Serialize)]
struct LookupOutput<'a> {
    query: &'a str,
    mappings: Vec<ResolvedMapping>,
}

fn env_limit(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn mapper_config() -> MapperConfig {
    let defaults = MapperConfig::default();
    MapperConfig {
        single_token_limit: env_limit("AYUSH_SINGLE_TOKEN_LIMIT", defaults.single_token_limit),
        substring_limit: env_limit("AYUSH_SUBSTRING_LIMIT", defaults.substring_limit),
        ..defaults
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_path = std::env::var("AYUSH_DATA_PATH")
        .unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
    let mappings_path = PathBuf::from(
        std::env::var("AYUSH_MAPPINGS_PATH").unwrap_or_else(|_| DEFAULT_MAPPINGS_PATH.to_string()),
    );
    let export_dir = PathBuf::from(
        std::env::var("AYUSH_EXPORT_DIR").unwrap_or_else(|_| DEFAULT_EXPORT_DIR.to_string()),
    );

    tracing::info!("Loading catalogs from: {}", data_path);
    let files = discover_catalog_files(&data_path)?;

    let mut catalogs = CatalogStore::new();
    catalogs.load_all(&files)?;
    tracing::info!(
        "Loaded {} NAMASTE terms ({:?}), {} ICD-11 concepts",
        catalogs.source_term_count(),
        catalogs.loaded_systems(),
        catalogs.target_count()
    );

    // Serve the previous run until the refresh completes
    let mappings = if mappings_path.exists() {
        match MappingStore::open(&mappings_path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Could not load previous mappings: {}", e);
                MappingStore::new()
            }
        }
    } else {
        MappingStore::new()
    };

    let service = MappingService::with_mappings(catalogs, mappings, mapper_config());
    tracing::info!("Previously published mappings: {}", service.snapshot().len());

    let report = service.refresh().await?;
    for strategy in &report.strategies {
        tracing::info!(
            "Strategy {} ({}): {} added",
            strategy.strategy.id(),
            strategy.strategy.name(),
            strategy.accepted
        );
    }
    tracing::info!(
        "Total mappings: {} ({} equivalent, {} relatedto), {} duplicates dropped",
        report.totals.total(),
        report.totals.equivalent,
        report.totals.related_to,
        report.duplicates_dropped()
    );

    service.persist(&mappings_path).await?;

    let set = service.snapshot();
    write_exports(&set, service.catalogs(), &export_dir)?;

    let queries: Vec<String> = std::env::args().skip(1).collect();
    for query in &queries {
        let output = LookupOutput {
            query,
            mappings: service.translate(query),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    if queries.is_empty() {
        tracing::info!("{} source codes mapped", service.list_source_codes().len());
    }

    Ok(())
}

fn write_exports(
    set: &ayush_loader::MappingSet,
    catalogs: &CatalogStore,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    export_mappings_csv(set, catalogs, dir.join("namaste_icd11_mappings.csv"))?;
    MappingSummary::from_set(set).write_summary(dir.join("namaste_icd11_mappings_summary.txt"))?;
    export_sample_csv(
        set,
        catalogs,
        dir.join("namaste_icd11_sample.csv"),
        SAMPLE_PER_PREFIX,
    )?;
    tracing::info!("Exports written to {}", dir.display());
    Ok(())
}
