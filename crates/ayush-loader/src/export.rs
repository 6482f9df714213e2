//! Review exports: annotated mapping CSVs and a text summary report.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use ayush_types::Mapping;
use tracing::info;

use crate::mapping_set::{EquivalenceCounts, MappingSet};
use crate::store::{CatalogStore, TermLookup};
use crate::types::CatalogResult;

/// Header of the annotated export.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "source_system",
    "source_code",
    "target_system",
    "target_code",
    "equivalence",
    "source_term",
    "source_definition",
    "target_title",
    "source_prefix",
    "target_prefix",
];

/// Number of source codes listed in the summary's top section.
const TOP_SOURCES: usize = 10;

/// The first two characters of a code, used to group codes by family.
pub fn code_prefix(code: &str) -> &str {
    match code.char_indices().nth(2) {
        Some((i, _)) => &code[..i],
        None => code,
    }
}

fn create_parent(path: &Path) -> CatalogResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_annotated<'m, P: AsRef<Path>>(
    mappings: impl IntoIterator<Item = &'m Mapping>,
    catalogs: &CatalogStore,
    path: P,
) -> CatalogResult<usize> {
    let path = path.as_ref();
    create_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EXPORT_COLUMNS)?;

    let mut count = 0;
    for mapping in mappings {
        let source_term = catalogs.lookup_display_name(&mapping.source_code).unwrap_or_default();
        let source_definition = catalogs
            .get_source_term(&mapping.source_code)
            .and_then(|t| t.definition.clone())
            .unwrap_or_default();
        let target_title = catalogs.lookup_target_title(&mapping.target_code).unwrap_or_default();

        writer.write_record([
            mapping.source_system.as_str(),
            mapping.source_code.as_str(),
            mapping.target_system.as_str(),
            mapping.target_code.as_str(),
            mapping.equivalence.as_str(),
            source_term.as_str(),
            source_definition.as_str(),
            target_title.as_str(),
            code_prefix(&mapping.source_code),
            code_prefix(&mapping.target_code),
        ])?;
        count += 1;
    }
    writer.flush()?;

    Ok(count)
}

/// Writes every mapping with catalog annotations, in set order.
pub fn export_mappings_csv<P: AsRef<Path>>(
    set: &MappingSet,
    catalogs: &CatalogStore,
    path: P,
) -> CatalogResult<usize> {
    let count = write_annotated(set, catalogs, path.as_ref())?;
    info!(count, path = %path.as_ref().display(), "Exported mappings");
    Ok(count)
}

/// Writes the first `per_prefix` mappings of each source code prefix.
pub fn export_sample_csv<P: AsRef<Path>>(
    set: &MappingSet,
    catalogs: &CatalogStore,
    path: P,
    per_prefix: usize,
) -> CatalogResult<usize> {
    let mut taken: HashMap<&str, usize> = HashMap::new();
    let sample = set.iter().filter(|&m| {
        let seen = taken.entry(code_prefix(&m.source_code)).or_insert(0);
        *seen += 1;
        *seen <= per_prefix
    });

    let count = write_annotated(sample, catalogs, path.as_ref())?;
    info!(count, per_prefix, path = %path.as_ref().display(), "Exported sample mappings");
    Ok(count)
}

/// Code and mapping counts for one code prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixCount {
    /// Distinct codes with the prefix.
    pub codes: usize,
    /// Mappings involving those codes.
    pub mappings: usize,
}

/// Aggregate statistics over a mapping set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSummary {
    /// Total mappings.
    pub total: usize,
    /// Counts per equivalence.
    pub equivalences: EquivalenceCounts,
    /// Distinct source codes.
    pub unique_sources: usize,
    /// Distinct target codes.
    pub unique_targets: usize,
    /// Breakdown by source code prefix.
    pub source_prefixes: BTreeMap<String, PrefixCount>,
    /// Breakdown by target code prefix.
    pub target_prefixes: BTreeMap<String, PrefixCount>,
    /// Most mapped source codes, most first, ties by code.
    pub top_sources: Vec<(String, usize)>,
    /// First mapping per source prefix, as `(prefix, source, target)`.
    pub prefix_samples: Vec<(String, String, String)>,
}

fn prefix_breakdown<'m>(codes: impl Iterator<Item = &'m str>) -> BTreeMap<String, PrefixCount> {
    let mut mappings: BTreeMap<&str, usize> = BTreeMap::new();
    let mut distinct: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for code in codes {
        let prefix = code_prefix(code);
        *mappings.entry(prefix).or_default() += 1;
        distinct.entry(prefix).or_default().insert(code);
    }

    mappings
        .into_iter()
        .map(|(prefix, count)| {
            let codes = distinct.get(prefix).map_or(0, BTreeSet::len);
            (
                prefix.to_string(),
                PrefixCount {
                    codes,
                    mappings: count,
                },
            )
        })
        .collect()
}

impl MappingSummary {
    /// Computes the summary of a set.
    pub fn from_set(set: &MappingSet) -> Self {
        let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
        let mut prefix_samples: Vec<(String, String, String)> = Vec::new();
        for mapping in set {
            *per_source.entry(mapping.source_code.as_str()).or_default() += 1;

            let prefix = code_prefix(&mapping.source_code);
            if !prefix_samples.iter().any(|(p, _, _)| p == prefix) {
                prefix_samples.push((
                    prefix.to_string(),
                    mapping.source_code.clone(),
                    mapping.target_code.clone(),
                ));
            }
        }

        let mut top_sources: Vec<(String, usize)> = per_source
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();
        top_sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_sources.truncate(TOP_SOURCES);

        Self {
            total: set.len(),
            equivalences: set.count_by_equivalence(),
            unique_sources: per_source.len(),
            unique_targets: set.unique_target_count(),
            source_prefixes: prefix_breakdown(set.iter().map(|m| m.source_code.as_str())),
            target_prefixes: prefix_breakdown(set.iter().map(|m| m.target_code.as_str())),
            top_sources,
            prefix_samples,
        }
    }

    /// Writes the text report to `path`.
    pub fn write_summary<P: AsRef<Path>>(&self, path: P) -> CatalogResult<()> {
        let path = path.as_ref();
        create_parent(path)?;
        fs::write(path, self.to_string())?;
        info!(path = %path.display(), "Wrote mapping summary");
        Ok(())
    }
}

impl fmt::Display for MappingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NAMASTE-ICD-11 MAPPING SUMMARY REPORT")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "Total Mappings: {}", self.total)?;
        writeln!(f, "  equivalent: {}", self.equivalences.equivalent)?;
        writeln!(f, "  relatedto: {}", self.equivalences.related_to)?;
        writeln!(f)?;
        writeln!(f, "Unique NAMASTE Codes Mapped: {}", self.unique_sources)?;
        writeln!(f, "Unique ICD-11 Codes Targeted: {}", self.unique_targets)?;
        writeln!(f)?;

        writeln!(f, "NAMASTE CODE PREFIX BREAKDOWN:")?;
        writeln!(f, "{}", "-".repeat(30))?;
        for (prefix, count) in &self.source_prefixes {
            writeln!(f, "{prefix}: {} codes -> {} mappings", count.codes, count.mappings)?;
        }
        writeln!(f)?;

        writeln!(f, "ICD-11 TM2 TARGET PREFIX BREAKDOWN:")?;
        writeln!(f, "{}", "-".repeat(35))?;
        for (prefix, count) in &self.target_prefixes {
            writeln!(f, "{prefix}: {} codes <- {} mappings", count.codes, count.mappings)?;
        }
        writeln!(f)?;

        writeln!(f, "TOP {TOP_SOURCES} MOST MAPPED NAMASTE CODES:")?;
        writeln!(f, "{}", "-".repeat(35))?;
        for (code, count) in &self.top_sources {
            writeln!(f, "{code}: {count} mappings")?;
        }
        writeln!(f)?;

        writeln!(f, "SAMPLE MAPPINGS BY PREFIX:")?;
        writeln!(f, "{}", "-".repeat(30))?;
        for (prefix, source, target) in &self.prefix_samples {
            writeln!(f, "{prefix}: {source} -> {target}")?;
        }
        Ok(())
    }
}
