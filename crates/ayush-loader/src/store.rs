//! In-memory catalog store.
//!
//! Holds the NAMASTE source catalogs and the ICD-11 TM2 target catalog after
//! loading them from CSV, and serves the code lookups used for display
//! annotation. Catalog order is preserved so pipeline runs are reproducible.

use std::collections::HashMap;
use std::path::Path;

use ayush_types::{normalize, SourceSystem, SourceTerm, TargetConcept};
use tracing::{info, warn};

use crate::parser::CatalogParser;
use crate::types::{CatalogConfig, CatalogError, CatalogFiles, CatalogResult};

/// Read access to loaded catalogs, as consumed by the mapping pipeline.
pub trait CatalogSource {
    /// Source terms of the given systems, in catalog order, system by system.
    ///
    /// # Errors
    /// Returns [`CatalogError::CatalogUnavailable`] if a requested system was
    /// never loaded.
    fn source_terms(&self, systems: &[SourceSystem]) -> CatalogResult<Vec<SourceTerm>>;

    /// Target concepts in catalog order.
    fn target_concepts(&self) -> CatalogResult<Vec<TargetConcept>>;
}

/// Display lookups by code, used to annotate resolved mappings.
pub trait TermLookup {
    /// Native display term of a source code.
    fn lookup_display_name(&self, code: &str) -> Option<String>;

    /// Title of a target code.
    fn lookup_target_title(&self, code: &str) -> Option<String>;
}

/// In-memory store for NAMASTE and ICD-11 catalogs.
///
/// # Example
///
/// ```ignore
/// use ayush_loader::{discover_catalog_files, CatalogStore};
///
/// let files = discover_catalog_files("/path/to/data")?;
/// let mut store = CatalogStore::new();
/// store.load_all(&files)?;
///
/// if let Some(term) = store.get_source_term("AAA.1") {
///     println!("Found: {:?}", term);
/// }
/// ```
#[derive(Default)]
pub struct CatalogStore {
    /// Source terms per system, in catalog order.
    sources: HashMap<SourceSystem, Vec<SourceTerm>>,
    /// Normalized source code -> (system, position). First occurrence wins.
    source_by_code: HashMap<String, (SourceSystem, usize)>,
    /// Target concepts in catalog order; `None` until loaded.
    targets: Option<Vec<TargetConcept>>,
    /// Normalized target code -> position. First occurrence wins.
    target_by_code: HashMap<String, usize>,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("sources", &self.source_term_count())
            .field("source_systems", &self.loaded_systems())
            .field("targets", &self.target_count())
            .finish()
    }
}

impl CatalogStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads one NAMASTE catalog from a CSV file, replacing any terms
    /// previously loaded for that system.
    pub fn load_source_terms<P: AsRef<Path>>(
        &mut self,
        system: SourceSystem,
        path: P,
        config: CatalogConfig,
    ) -> CatalogResult<usize> {
        let terms = CatalogParser::<_, SourceTerm>::from_path(path, system, config)?.parse_all()?;
        let count = terms.len();
        self.insert_source_terms(system, terms);
        Ok(count)
    }

    /// Loads the ICD-11 catalog from a CSV file, replacing any loaded targets.
    pub fn load_target_concepts<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: CatalogConfig,
    ) -> CatalogResult<usize> {
        let concepts = CatalogParser::<_, TargetConcept>::from_path(path, (), config)?.parse_all()?;
        let count = concepts.len();
        self.insert_target_concepts(concepts);
        Ok(count)
    }

    /// Loads all discovered catalogs.
    ///
    /// The target and Ayurveda catalogs are required; a Siddha or Unani
    /// catalog that fails to load is logged and skipped.
    pub fn load_all(&mut self, files: &CatalogFiles) -> CatalogResult<()> {
        let target_path = files
            .target_file
            .as_ref()
            .ok_or_else(|| CatalogError::CatalogUnavailable {
                catalog: "ICD-11".to_string(),
            })?;
        let targets = self.load_target_concepts(target_path, CatalogConfig::default())?;
        info!(count = targets, path = %target_path.display(), "Loaded ICD-11 concepts");

        for system in SourceSystem::ALL {
            let Some(path) = files.source_file(system) else {
                if system == SourceSystem::Ayurveda {
                    return Err(CatalogError::CatalogUnavailable {
                        catalog: format!("NAMASTE {system}"),
                    });
                }
                continue;
            };

            match self.load_source_terms(system, path, CatalogConfig::default()) {
                Ok(count) => {
                    info!(count, system = %system, path = %path.display(), "Loaded NAMASTE terms");
                }
                Err(e) if system != SourceSystem::Ayurveda => {
                    warn!(system = %system, error = %e, "Skipping optional NAMASTE catalog");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Loads all discovered catalogs, parsing the files concurrently.
    ///
    /// Same required/optional rules as [`CatalogStore::load_all`].
    #[cfg(feature = "parallel")]
    pub fn load_all_parallel(&mut self, files: &CatalogFiles) -> CatalogResult<()> {
        let target_path = files
            .target_file
            .clone()
            .ok_or_else(|| CatalogError::CatalogUnavailable {
                catalog: "ICD-11".to_string(),
            })?;
        if files.ayurveda_file.is_none() {
            return Err(CatalogError::CatalogUnavailable {
                catalog: format!("NAMASTE {}", SourceSystem::Ayurveda),
            });
        }

        let parse_source = |system: SourceSystem| {
            files.source_file(system).map(|p| {
                CatalogParser::<_, SourceTerm>::from_path(p, system, CatalogConfig::default())
                    .and_then(|parser| parser.parse_all())
            })
        };

        let (targets, (ayurveda, (siddha, unani))) = rayon::join(
            || {
                CatalogParser::<_, TargetConcept>::from_path(
                    &target_path,
                    (),
                    CatalogConfig::default(),
                )
                .and_then(|parser| parser.parse_all())
            },
            || {
                rayon::join(
                    || parse_source(SourceSystem::Ayurveda),
                    || {
                        rayon::join(
                            || parse_source(SourceSystem::Siddha),
                            || parse_source(SourceSystem::Unani),
                        )
                    },
                )
            },
        );

        let targets = targets?;
        info!(count = targets.len(), "Loaded ICD-11 concepts");
        self.insert_target_concepts(targets);

        for (system, parsed) in [
            (SourceSystem::Ayurveda, ayurveda),
            (SourceSystem::Siddha, siddha),
            (SourceSystem::Unani, unani),
        ] {
            match parsed {
                Some(Ok(terms)) => {
                    info!(count = terms.len(), system = %system, "Loaded NAMASTE terms");
                    self.insert_source_terms(system, terms);
                }
                Some(Err(e)) if system != SourceSystem::Ayurveda => {
                    warn!(system = %system, error = %e, "Skipping optional NAMASTE catalog");
                }
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        Ok(())
    }

    /// Inserts source terms for a system, replacing what was there.
    pub fn insert_source_terms(
        &mut self,
        system: SourceSystem,
        terms: impl IntoIterator<Item = SourceTerm>,
    ) {
        let terms: Vec<SourceTerm> = terms.into_iter().collect();
        self.sources.insert(system, terms);
        self.reindex_sources();
    }

    /// Inserts target concepts, replacing what was there.
    pub fn insert_target_concepts(&mut self, concepts: impl IntoIterator<Item = TargetConcept>) {
        let concepts: Vec<TargetConcept> = concepts.into_iter().collect();

        self.target_by_code.clear();
        for (i, concept) in concepts.iter().enumerate() {
            if concept.is_coded() {
                self.target_by_code
                    .entry(normalize(&concept.code))
                    .or_insert(i);
            }
        }
        self.targets = Some(concepts);
    }

    fn reindex_sources(&mut self) {
        self.source_by_code.clear();
        for system in SourceSystem::ALL {
            let Some(terms) = self.sources.get(&system) else {
                continue;
            };
            for (i, term) in terms.iter().enumerate() {
                let code = normalize(&term.code);
                if !code.is_empty() {
                    self.source_by_code.entry(code).or_insert((system, i));
                }
            }
        }
    }

    /// Gets a source term by code (normalized before lookup).
    pub fn get_source_term(&self, code: &str) -> Option<&SourceTerm> {
        let (system, i) = self.source_by_code.get(&normalize(code))?;
        self.sources.get(system)?.get(*i)
    }

    /// Gets a target concept by code (normalized before lookup).
    pub fn get_target_concept(&self, code: &str) -> Option<&TargetConcept> {
        let i = self.target_by_code.get(&normalize(code))?;
        self.targets.as_ref()?.get(*i)
    }

    /// Source terms of one system, in catalog order.
    pub fn get_source_terms(&self, system: SourceSystem) -> Option<&[SourceTerm]> {
        self.sources.get(&system).map(Vec::as_slice)
    }

    /// Target concepts in catalog order.
    pub fn get_target_concepts(&self) -> Option<&[TargetConcept]> {
        self.targets.as_deref()
    }

    /// Returns true if the system's catalog has been loaded.
    pub fn has_source_system(&self, system: SourceSystem) -> bool {
        self.sources.contains_key(&system)
    }

    /// Loaded source systems in canonical order.
    pub fn loaded_systems(&self) -> Vec<SourceSystem> {
        SourceSystem::ALL
            .into_iter()
            .filter(|s| self.sources.contains_key(s))
            .collect()
    }

    /// Returns true if the target catalog has been loaded.
    pub fn has_targets(&self) -> bool {
        self.targets.is_some()
    }

    /// Returns the total number of source terms across systems.
    pub fn source_term_count(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    /// Returns the number of target concepts.
    pub fn target_count(&self) -> usize {
        self.targets.as_ref().map_or(0, Vec::len)
    }
}

impl CatalogSource for CatalogStore {
    fn source_terms(&self, systems: &[SourceSystem]) -> CatalogResult<Vec<SourceTerm>> {
        let mut terms = Vec::new();
        for system in systems {
            let loaded = self
                .sources
                .get(system)
                .ok_or_else(|| CatalogError::CatalogUnavailable {
                    catalog: format!("NAMASTE {system}"),
                })?;
            terms.extend(loaded.iter().cloned());
        }
        Ok(terms)
    }

    fn target_concepts(&self) -> CatalogResult<Vec<TargetConcept>> {
        self.targets
            .clone()
            .ok_or_else(|| CatalogError::CatalogUnavailable {
                catalog: "ICD-11".to_string(),
            })
    }
}

impl TermLookup for CatalogStore {
    fn lookup_display_name(&self, code: &str) -> Option<String> {
        self.get_source_term(code)
            .map(|t| t.display_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn lookup_target_title(&self, code: &str) -> Option<String> {
        self.get_target_concept(code)
            .map(|c| c.title.trim())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_term(code: &str, display: &str, system: SourceSystem) -> SourceTerm {
        SourceTerm::new(code, display, system)
    }

    fn make_store() -> CatalogStore {
        let mut store = CatalogStore::new();
        store.insert_source_terms(
            SourceSystem::Ayurveda,
            [
                make_term("AAA.1", "jvaraH", SourceSystem::Ayurveda),
                make_term("SR10 (TM2)", "vAtasaFcayaH", SourceSystem::Ayurveda),
                make_term("AAA.1", "duplicate", SourceSystem::Ayurveda),
            ],
        );
        store.insert_source_terms(
            SourceSystem::Unani,
            [make_term("U-1", "", SourceSystem::Unani)],
        );
        store.insert_target_concepts([
            TargetConcept::new("SR1", "Fever, unspecified"),
            TargetConcept::new("", "Chapter heading"),
        ]);
        store
    }

    #[test]
    fn test_store_counts() {
        let store = make_store();
        assert_eq!(store.source_term_count(), 4);
        assert_eq!(store.target_count(), 2);
        assert!(store.has_source_system(SourceSystem::Ayurveda));
        assert!(!store.has_source_system(SourceSystem::Siddha));
        assert_eq!(
            store.loaded_systems(),
            vec![SourceSystem::Ayurveda, SourceSystem::Unani]
        );
    }

    #[test]
    fn test_lookup_by_normalized_code() {
        let store = make_store();

        assert_eq!(
            store.lookup_display_name("SR10\u{00A0} (TM2)").as_deref(),
            Some("vAtasaFcayaH")
        );
        // First occurrence wins.
        assert_eq!(store.lookup_display_name("AAA.1").as_deref(), Some("jvaraH"));
        // Blank display is treated as absent.
        assert_eq!(store.lookup_display_name("U-1"), None);
        assert_eq!(
            store.lookup_target_title(" SR1 ").as_deref(),
            Some("Fever, unspecified")
        );
        assert_eq!(store.lookup_target_title("SR2"), None);
    }

    #[test]
    fn test_catalog_source_unavailable() {
        let store = CatalogStore::new();
        assert!(matches!(
            store.target_concepts(),
            Err(CatalogError::CatalogUnavailable { .. })
        ));

        let store = make_store();
        let terms = store
            .source_terms(&[SourceSystem::Ayurveda, SourceSystem::Unani])
            .unwrap();
        assert_eq!(terms.len(), 4);
        assert_eq!(terms[3].code, "U-1");
        assert!(store.source_terms(&[SourceSystem::Siddha]).is_err());
    }

    fn write_catalogs(name: &str, with_bad_siddha: bool) -> (PathBuf, CatalogFiles) {
        let dir = std::env::temp_dir().join(format!("ayush-store-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let target = dir.join("ICD-11.csv");
        fs::write(&target, "Code,Title\nSR1,\"Fever, unspecified\"\n,Chapter\n").unwrap();
        let ayurveda = dir.join("namaste_ayurveda_morbidity.csv");
        fs::write(
            &ayurveda,
            "NAMC_CODE,NAMC_term,Name English\nAAA.1,jvaraH,fever\n",
        )
        .unwrap();

        let mut files = CatalogFiles {
            target_file: Some(target),
            ayurveda_file: Some(ayurveda),
            ..Default::default()
        };

        if with_bad_siddha {
            let siddha = dir.join("namaste_siddha_morbidity.csv");
            fs::write(&siddha, "unexpected\nx\n").unwrap();
            files.siddha_file = Some(siddha);
        }

        (dir, files)
    }

    #[test]
    fn test_load_all_skips_broken_optional_catalog() {
        let (dir, files) = write_catalogs("load-all", true);

        let mut store = CatalogStore::new();
        store.load_all(&files).unwrap();

        assert_eq!(store.target_count(), 1);
        assert_eq!(store.source_term_count(), 1);
        assert!(!store.has_source_system(SourceSystem::Siddha));
        assert_eq!(
            store.get_source_term("AAA.1").unwrap().english_name.as_deref(),
            Some("fever")
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_all_requires_ayurveda() {
        let (dir, mut files) = write_catalogs("load-required", false);
        files.ayurveda_file = None;

        let mut store = CatalogStore::new();
        assert!(matches!(
            store.load_all(&files),
            Err(CatalogError::CatalogUnavailable { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_load_all_parallel_matches_sequential() {
        let (dir, files) = write_catalogs("load-parallel", true);

        let mut sequential = CatalogStore::new();
        sequential.load_all(&files).unwrap();
        let mut parallel = CatalogStore::new();
        parallel.load_all_parallel(&files).unwrap();

        assert_eq!(
            sequential.get_target_concepts(),
            parallel.get_target_concepts()
        );
        assert_eq!(
            sequential.get_source_terms(SourceSystem::Ayurveda),
            parallel.get_source_terms(SourceSystem::Ayurveda)
        );
        assert!(!parallel.has_source_system(SourceSystem::Siddha));

        fs::remove_dir_all(&dir).unwrap();
    }
}
