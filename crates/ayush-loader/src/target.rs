//! ICD-11 TM2 catalog parser.
//!
//! Parses the `ICD-11.csv` linearization export into [`TargetConcept`]s.

use ayush_types::TargetConcept;

use crate::parser::{CatalogRecord, Row};
use crate::types::{CatalogConfig, CatalogResult};

/// Expected file name of the ICD-11 export.
pub const TARGET_FILE_NAME: &str = "ICD-11.csv";

/// Required columns in the ICD-11 export (after header normalization).
const TARGET_COLUMNS: &[&str] = &["code", "title"];

impl CatalogRecord for TargetConcept {
    type Layout = ();

    fn required_columns(_: &()) -> &'static [&'static str] {
        TARGET_COLUMNS
    }

    fn from_row(row: &Row<'_>, _: &()) -> CatalogResult<Self> {
        Ok(TargetConcept {
            code: row.required("code")?.to_string(),
            // The WHO export prefixes titles with hierarchy dashes.
            title: row
                .required("title")?
                .trim_start_matches(['-', ' '])
                .to_string(),
        })
    }

    fn passes_filter(&self, config: &CatalogConfig) -> bool {
        if config.skip_uncoded && !self.is_coded() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CatalogParser;

    #[test]
    fn test_parse_target_catalog() {
        let csv = "\
Foundation URI,Linearization URI,Code,BlockId,Title,ClassKind
http://a,http://b,,,Chapter 26 Traditional medicine,chapter
http://c,http://d,SR10,,- - Vata pattern (TM2),category
http://e,http://f,SR1,,Fever, unspecified,category
";
        // Unquoted comma in the last title shifts ClassKind; title is still read by name.
        let concepts = CatalogParser::<_, TargetConcept>::from_reader(
            csv.as_bytes(),
            (),
            CatalogConfig::default(),
        )
        .unwrap()
        .parse_all()
        .unwrap();

        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[0], TargetConcept::new("SR10", "Vata pattern (TM2)"));
        assert_eq!(concepts[1].code, "SR1");
        assert_eq!(concepts[1].title, "Fever");
    }

    #[test]
    fn test_quoted_title_with_comma() {
        let csv = "code,title\nSR1,\"Fever, unspecified\"\n";
        let concepts = CatalogParser::<_, TargetConcept>::from_reader(
            csv.as_bytes(),
            (),
            CatalogConfig::default(),
        )
        .unwrap()
        .parse_all()
        .unwrap();

        assert_eq!(concepts, vec![TargetConcept::new("SR1", "Fever, unspecified")]);
    }
}
