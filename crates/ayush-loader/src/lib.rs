//! # ayush-loader
//!
//! Loads the NAMASTE and ICD-11 TM2 catalogs, computes the cross-reference
//! mappings between them and serves tolerant point lookups.
//!
//! ## Features
//!
//! - `parallel` (default): parallel catalog parsing and candidate generation
//!   via rayon.
//! - `serde` (default): `Serialize` for reports and resolved mappings.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use ayush_loader::{
//!     discover_catalog_files, CatalogStore, LookupResolver, MapperConfig, MappingPipeline,
//!     MappingRepository, MappingStore,
//! };
//!
//! let files = discover_catalog_files("/path/to/data")?;
//! let mut catalogs = CatalogStore::new();
//! catalogs.load_all(&files)?;
//!
//! let config = MapperConfig::default();
//! let run = MappingPipeline::new(config.clone()).run(&catalogs)?;
//!
//! let mappings = Arc::new(MappingStore::new());
//! mappings.publish(run.set);
//!
//! let resolver = LookupResolver::new(mappings, Arc::new(catalogs), &config);
//! for resolved in resolver.resolve_mappings("SR10") {
//!     println!("{} -> {}", resolved.source_display, resolved.target_display);
//! }
//! ```

#![warn(missing_docs)]

mod export;
mod index;
mod loader;
mod mapping_set;
mod mapping_store;
mod parser;
mod pipeline;
mod resolver;
mod source;
mod store;
mod target;
mod types;

pub use export::{
    code_prefix, export_mappings_csv, export_sample_csv, MappingSummary, PrefixCount,
    EXPORT_COLUMNS,
};
pub use index::{parse_query, tokenize, MatchingEngine, TargetIndex, TextSearchError};
pub use loader::discover_catalog_files;
pub use mapping_set::{EquivalenceCounts, MappingSet, MappingSetBuilder, RepairStats};
pub use mapping_store::{
    read_mappings_csv, write_mappings_csv, MappingRepository, MappingStore, MAPPING_COLUMNS,
};
pub use parser::{normalize_header, CatalogParser, CatalogRecord, HeaderMap, Row};
pub use pipeline::{MappingPipeline, MappingRun, PipelineReport, StrategyReport};
pub use resolver::{LookupResolver, ResolvedMapping};
pub use source::{source_columns, source_file_name, SourceColumns};
pub use store::{CatalogSource, CatalogStore, TermLookup};
pub use target::TARGET_FILE_NAME;
pub use types::{
    CatalogConfig, CatalogError, CatalogFiles, CatalogResult, LengthBounds, MapperConfig,
};

// Re-export ayush-types for convenience
pub use ayush_types;
