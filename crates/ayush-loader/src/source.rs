//! NAMASTE morbidity catalog parser.
//!
//! Parses `namaste_{ayurveda,siddha,unani}_morbidity.csv` exports into
//! [`SourceTerm`]s. The three catalogs share a shape but not column names.

use ayush_types::{SourceSystem, SourceTerm};

use crate::parser::{CatalogRecord, Row};
use crate::types::{CatalogConfig, CatalogResult};

/// Column names of one NAMASTE catalog export, after header normalization.
#[derive(Debug, Clone, Copy)]
pub struct SourceColumns {
    /// Columns that must be present in the header.
    pub required: &'static [&'static str],
    /// The code column.
    pub code: &'static str,
    /// Candidate columns for the display term, first non-blank wins.
    pub term: &'static [&'static str],
    /// Candidate columns for the English name.
    pub english: &'static [&'static str],
    /// Candidate columns for the alternate English name.
    pub alternate: &'static [&'static str],
    /// Candidate columns for the definition.
    pub definition: &'static [&'static str],
}

const AYURVEDA_COLUMNS: SourceColumns = SourceColumns {
    required: &["namc_code", "namc_term"],
    code: "namc_code",
    term: &["namc_term"],
    english: &["name_english"],
    alternate: &["name_english_under_index"],
    definition: &["short_definition", "long_definition"],
};

const SIDDHA_COLUMNS: SourceColumns = SourceColumns {
    required: &["namc_code", "namc_term"],
    code: "namc_code",
    term: &["namc_term"],
    english: &["name_english"],
    alternate: &["name_english_under_index"],
    definition: &["short_definition", "long_definition"],
};

const UNANI_COLUMNS: SourceColumns = SourceColumns {
    required: &["numc_code"],
    code: "numc_code",
    term: &["numc_term", "arabic_term"],
    english: &["name_english"],
    alternate: &["name_english_under_index"],
    definition: &["short_definition", "long_definition"],
};

/// Returns the column layout of a NAMASTE catalog.
pub fn source_columns(system: SourceSystem) -> &'static SourceColumns {
    match system {
        SourceSystem::Ayurveda => &AYURVEDA_COLUMNS,
        SourceSystem::Siddha => &SIDDHA_COLUMNS,
        SourceSystem::Unani => &UNANI_COLUMNS,
    }
}

/// Expected file name of a NAMASTE catalog export.
pub fn source_file_name(system: SourceSystem) -> &'static str {
    match system {
        SourceSystem::Ayurveda => "namaste_ayurveda_morbidity.csv",
        SourceSystem::Siddha => "namaste_siddha_morbidity.csv",
        SourceSystem::Unani => "namaste_unani_morbidity.csv",
    }
}

impl CatalogRecord for SourceTerm {
    type Layout = SourceSystem;

    fn required_columns(layout: &SourceSystem) -> &'static [&'static str] {
        source_columns(*layout).required
    }

    fn from_row(row: &Row<'_>, layout: &SourceSystem) -> CatalogResult<Self> {
        let columns = source_columns(*layout);
        Ok(SourceTerm {
            code: row.required(columns.code)?.to_string(),
            display_name: row.first_of(columns.term).unwrap_or_default(),
            english_name: row.first_of(columns.english),
            alternate_english_name: row.first_of(columns.alternate),
            definition: row.first_of(columns.definition),
            system: *layout,
        })
    }

    fn passes_filter(&self, config: &CatalogConfig) -> bool {
        if config.skip_uncoded && self.code.trim().is_empty() {
            return false;
        }
        true
    }
}
