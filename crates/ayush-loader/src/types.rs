//! Loader-specific types: errors, configuration and discovered catalog files.

use std::path::PathBuf;

use ayush_types::{well_known, SourceSystem};
use thiserror::Error;

/// Errors that can occur while loading catalogs or mapping files.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// I/O error reading or writing a catalog file.
    #[error("IO error reading catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing required column in a catalog file.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// The name of the missing column.
        column: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Directory not found.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Required catalog missing from the data directory.
    #[error("Required catalog not found: {catalog} in {directory}")]
    RequiredFileMissing {
        /// The catalog(s) that were missing.
        catalog: String,
        /// The directory that was searched.
        directory: String,
    },

    /// A persisted mapping row carries an equivalence outside the vocabulary.
    #[error("Invalid equivalence '{value}' on line {line}")]
    InvalidEquivalence {
        /// The rejected value.
        value: String,
        /// 1-based line number in the mapping file.
        line: u64,
    },

    /// A catalog needed for a pipeline run has not been loaded.
    #[error("Catalog not loaded: {catalog}")]
    CatalogUnavailable {
        /// The catalog that was requested.
        catalog: String,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Configuration for catalog CSV parsing.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Whether rows with a blank code are dropped.
    pub skip_uncoded: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_uncoded: true,
        }
    }
}

impl CatalogConfig {
    /// Creates a config for tab-delimited exports.
    pub fn tab_delimited() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }
}

/// Exclusive character-length window for a name used as a search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Names must be strictly longer than this.
    pub min_exclusive: usize,
    /// Names must be strictly shorter than this.
    pub max_exclusive: usize,
}

impl LengthBounds {
    /// Creates a new window.
    pub const fn new(min_exclusive: usize, max_exclusive: usize) -> Self {
        Self {
            min_exclusive,
            max_exclusive,
        }
    }

    /// Returns true if `len` lies strictly inside the window.
    pub fn contains(&self, len: usize) -> bool {
        len > self.min_exclusive && len < self.max_exclusive
    }
}

/// Configuration for a mapping pipeline run and the lookup resolver.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Value written to `source_system` on every mapping.
    pub source_system: String,
    /// Value written to `target_system` on every mapping.
    pub target_system: String,
    /// Label for synthesized source displays.
    pub source_display_label: String,
    /// Label for synthesized target displays.
    pub target_display_label: String,
    /// Source catalogs whose terms are mapped.
    pub source_systems: Vec<SourceSystem>,
    /// Maximum new mappings the single-token strategy may add per run.
    pub single_token_limit: usize,
    /// Maximum new mappings the substring strategy may add per run.
    pub substring_limit: usize,
    /// Accepted English name lengths for the single-token strategy.
    pub single_token_length: LengthBounds,
    /// Accepted English name lengths for the substring strategy.
    pub substring_length: LengthBounds,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            source_system: well_known::SOURCE_SYSTEM.to_string(),
            target_system: well_known::TARGET_SYSTEM.to_string(),
            source_display_label: well_known::SOURCE_DISPLAY_LABEL.to_string(),
            target_display_label: well_known::TARGET_DISPLAY_LABEL.to_string(),
            source_systems: vec![SourceSystem::Ayurveda],
            single_token_limit: 100,
            substring_limit: 150,
            single_token_length: LengthBounds::new(3, 20),
            substring_length: LengthBounds::new(5, 30),
        }
    }
}

impl MapperConfig {
    /// Creates a config that maps every NAMASTE catalog.
    pub fn all_systems() -> Self {
        Self {
            source_systems: SourceSystem::ALL.to_vec(),
            ..Default::default()
        }
    }

    /// Creates a config without caps on the capped strategies.
    pub fn uncapped() -> Self {
        Self {
            single_token_limit: usize::MAX,
            substring_limit: usize::MAX,
            ..Default::default()
        }
    }
}

/// Discovered catalog files in a data directory.
#[derive(Debug, Clone, Default)]
pub struct CatalogFiles {
    /// Path to the ICD-11 TM2 export.
    pub target_file: Option<PathBuf>,
    /// Path to the NAMASTE Ayurveda morbidity catalog.
    pub ayurveda_file: Option<PathBuf>,
    /// Path to the NAMASTE Siddha morbidity catalog.
    pub siddha_file: Option<PathBuf>,
    /// Path to the NAMASTE Unani morbidity catalog.
    pub unani_file: Option<PathBuf>,
}

impl CatalogFiles {
    /// Creates a new empty CatalogFiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the catalog path for a source system, if discovered.
    pub fn source_file(&self, system: SourceSystem) -> Option<&PathBuf> {
        match system {
            SourceSystem::Ayurveda => self.ayurveda_file.as_ref(),
            SourceSystem::Siddha => self.siddha_file.as_ref(),
            SourceSystem::Unani => self.unani_file.as_ref(),
        }
    }

    /// Returns true if all required files (target, Ayurveda) are present.
    pub fn has_required_files(&self) -> bool {
        self.target_file.is_some() && self.ayurveda_file.is_some()
    }

    /// Returns a list of missing required files.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.target_file.is_none() {
            missing.push("ICD-11");
        }
        if self.ayurveda_file.is_none() {
            missing.push("NAMASTE Ayurveda");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_config_default() {
        let config = CatalogConfig::default();
        assert_eq!(config.delimiter, b',');
        assert!(config.skip_uncoded);
        assert_eq!(CatalogConfig::tab_delimited().delimiter, b'\t');
    }

    #[test]
    fn test_mapper_config_default() {
        let config = MapperConfig::default();
        assert_eq!(config.source_system, "NAMASTE");
        assert_eq!(config.target_system, "ICD-11 TM2");
        assert_eq!(config.single_token_limit, 100);
        assert_eq!(config.substring_limit, 150);
        assert_eq!(config.source_systems, vec![SourceSystem::Ayurveda]);
        assert_eq!(MapperConfig::all_systems().source_systems.len(), 3);
    }

    #[test]
    fn test_length_bounds_exclusive() {
        let bounds = LengthBounds::new(3, 20);
        assert!(!bounds.contains(3));
        assert!(bounds.contains(4));
        assert!(bounds.contains(19));
        assert!(!bounds.contains(20));
    }

    #[test]
    fn test_catalog_files_missing() {
        let files = CatalogFiles {
            ayurveda_file: Some(PathBuf::from("namaste_ayurveda_morbidity.csv")),
            ..Default::default()
        };

        assert!(!files.has_required_files());
        assert_eq!(files.missing_files(), vec!["ICD-11"]);
        assert!(files.source_file(SourceSystem::Ayurveda).is_some());
        assert!(files.source_file(SourceSystem::Unani).is_none());
    }
}
