//! Published mapping storage.
//!
//! [`MappingStore`] holds the current [`MappingSet`] behind an `Arc` that is
//! swapped whole on publish, so readers always see one complete run. The set
//! can be persisted to and restored from a CSV file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ayush_types::{normalize, Equivalence, Mapping};
use tracing::info;

use crate::mapping_set::MappingSet;
use crate::parser::{CatalogParser, CatalogRecord, Row};
use crate::types::{CatalogConfig, CatalogError, CatalogResult};

/// Header of the persisted mapping file.
pub const MAPPING_COLUMNS: [&str; 5] = [
    "source_system",
    "source_code",
    "target_system",
    "target_code",
    "equivalence",
];

/// Storage for the published mapping set.
pub trait MappingRepository: Send + Sync {
    /// Replaces the published set.
    fn publish(&self, set: MappingSet);

    /// Returns the published set.
    fn snapshot(&self) -> Arc<MappingSet>;
}

/// In-memory [`MappingRepository`] with atomic replacement.
#[derive(Debug, Default)]
pub struct MappingStore {
    current: RwLock<Arc<MappingSet>>,
}

impl MappingStore {
    /// Creates a store with an empty published set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store publishing `set`.
    pub fn with_set(set: MappingSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    /// Creates a store publishing the mappings persisted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        Ok(Self::with_set(read_mappings_csv(path)?))
    }

    /// Writes the published set to `path`.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> CatalogResult<usize> {
        write_mappings_csv(&self.snapshot(), path)
    }

    /// Loads the set persisted at `path` and publishes it.
    ///
    /// On error the published set is left untouched.
    pub fn restore<P: AsRef<Path>>(&self, path: P) -> CatalogResult<usize> {
        let set = read_mappings_csv(path)?;
        let count = set.len();
        self.publish(set);
        Ok(count)
    }
}

impl MappingRepository for MappingStore {
    fn publish(&self, set: MappingSet) {
        let set = Arc::new(set);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = set;
    }

    fn snapshot(&self) -> Arc<MappingSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CatalogRecord for Mapping {
    type Layout = ();

    fn required_columns(_: &()) -> &'static [&'static str] {
        &MAPPING_COLUMNS
    }

    fn from_row(row: &Row<'_>, _: &()) -> CatalogResult<Self> {
        let raw = row.required("equivalence")?.trim();
        let equivalence = raw
            .parse::<Equivalence>()
            .ok()
            .filter(|e| e.is_emitted())
            .ok_or_else(|| CatalogError::InvalidEquivalence {
                value: raw.to_string(),
                line: row.line(),
            })?;

        Ok(Mapping {
            source_system: row.required("source_system")?.to_string(),
            source_code: normalize(row.required("source_code")?),
            target_system: row.required("target_system")?.to_string(),
            target_code: normalize(row.required("target_code")?),
            equivalence,
            strategy: None,
        })
    }

    fn passes_filter(&self, config: &CatalogConfig) -> bool {
        if config.skip_uncoded && (self.source_code.is_empty() || self.target_code.is_empty())
        {
            return false;
        }
        true
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes a mapping set as CSV, replacing `path` atomically.
///
/// Rows are written in set order to `<path>.tmp`, which is then renamed over
/// `path`. The existing file is left untouched on error.
///
/// # Errors
/// Fails without writing anything if a row carries an equivalence other than
/// `equivalent` or `relatedto`.
pub fn write_mappings_csv<P: AsRef<Path>>(set: &MappingSet, path: P) -> CatalogResult<usize> {
    let path = path.as_ref();
    if let Some((i, mapping)) = set
        .iter()
        .enumerate()
        .find(|(_, m)| !m.equivalence.is_emitted())
    {
        return Err(CatalogError::InvalidEquivalence {
            value: mapping.equivalence.as_str().to_string(),
            // Header is line 1.
            line: i as u64 + 2,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let written = write_rows(set, &tmp)
        .and_then(|()| fs::rename(&tmp, path).map_err(CatalogError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    info!(count = set.len(), path = %path.display(), "Persisted mappings");
    Ok(set.len())
}

fn write_rows(set: &MappingSet, path: &Path) -> CatalogResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(MAPPING_COLUMNS)?;
    for mapping in set {
        writer.write_record([
            mapping.source_system.as_str(),
            mapping.source_code.as_str(),
            mapping.target_system.as_str(),
            mapping.target_code.as_str(),
            mapping.equivalence.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a persisted mapping CSV.
///
/// Codes are normalized on read; a row whose normalized pair repeats an
/// earlier row is discarded.
///
/// # Errors
/// Fails on a missing column or an equivalence other than `equivalent` or
/// `relatedto`.
pub fn read_mappings_csv<P: AsRef<Path>>(path: P) -> CatalogResult<MappingSet> {
    let mappings =
        CatalogParser::<_, Mapping>::from_path(path, (), CatalogConfig::default())?.parse_all()?;
    Ok(MappingSet::from_mappings(mappings))
}
