//! Mapping service implementation.

use std::path::PathBuf;
use std::sync::Arc;

use ayush_loader::{
    write_mappings_csv, CatalogError, CatalogStore, LookupResolver, MapperConfig, MappingPipeline,
    MappingRepository, MappingSet, MappingStore, PipelineReport, ResolvedMapping,
};
use thiserror::Error;
use tracing::info;

/// Errors raised by service operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Catalog or mapping file failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared handle over the catalogs, the published mappings and the resolver.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct MappingService {
    catalogs: Arc<CatalogStore>,
    mappings: Arc<MappingStore>,
    pipeline: Arc<MappingPipeline>,
    resolver: LookupResolver,
}

impl std::fmt::Debug for MappingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingService")
            .field("catalogs", &self.catalogs)
            .field("mappings", &self.mappings.snapshot().len())
            .finish()
    }
}

impl MappingService {
    /// Creates a service with an empty published set.
    pub fn new(catalogs: CatalogStore, config: MapperConfig) -> Self {
        Self::with_mappings(catalogs, MappingStore::new(), config)
    }

    /// Creates a service over an existing mapping store.
    pub fn with_mappings(catalogs: CatalogStore, mappings: MappingStore, config: MapperConfig) -> Self {
        let catalogs = Arc::new(catalogs);
        let mappings = Arc::new(mappings);
        let resolver = LookupResolver::new(mappings.clone(), catalogs.clone(), &config);

        Self {
            catalogs,
            mappings,
            pipeline: Arc::new(MappingPipeline::new(config)),
            resolver,
        }
    }

    /// Returns the catalog store.
    pub fn catalogs(&self) -> &CatalogStore {
        &self.catalogs
    }

    /// Returns the published mapping set.
    pub fn snapshot(&self) -> Arc<MappingSet> {
        self.mappings.snapshot()
    }

    /// Recomputes the mappings and publishes them.
    ///
    /// The pipeline runs on the blocking pool. If it fails, the previously
    /// published set stays in place.
    pub async fn refresh(&self) -> ServiceResult<PipelineReport> {
        let catalogs = self.catalogs.clone();
        let pipeline = self.pipeline.clone();

        let run = tokio::task::spawn_blocking(move || pipeline.run(catalogs.as_ref())).await??;

        let set = run.set;
        info!(
            mappings = set.len(),
            unique_sources = set.source_codes().len(),
            unique_targets = set.unique_target_count(),
            "Publishing mapping set"
        );
        self.mappings.publish(set);

        Ok(run.report)
    }

    /// Writes the published set to a CSV file on the blocking pool.
    pub async fn persist(&self, path: impl Into<PathBuf>) -> ServiceResult<usize> {
        let path = path.into();
        let set = self.mappings.snapshot();
        let count = tokio::task::spawn_blocking(move || write_mappings_csv(&set, path)).await??;
        Ok(count)
    }

    /// Resolves a query code to its annotated mappings.
    pub fn translate(&self, code: &str) -> Vec<ResolvedMapping> {
        self.resolver.resolve_mappings(code)
    }

    /// Native display term of a source code.
    pub fn lookup_display_name(&self, code: &str) -> Option<String> {
        self.resolver.lookup_display_name(code)
    }

    /// Title of a target code.
    pub fn lookup_target_title(&self, code: &str) -> Option<String> {
        self.resolver.lookup_target_title(code)
    }

    /// Distinct mapped source codes, sorted.
    pub fn list_source_codes(&self) -> Vec<String> {
        self.resolver.list_source_codes()
    }
}
