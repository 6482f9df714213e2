//! # ayush-types
//!
//! Type definitions for mapping NAMASTE traditional-medicine codes to
//! ICD-11 TM2 classification codes.
//!
//! This crate provides the catalog record types, the mapping vocabulary and
//! the code normalizer shared by the loader and the service.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!   Disable this feature for zero-dependency usage.
//!
//! ## Usage
//!
//! ```rust
//! use ayush_types::{normalize, Equivalence, Mapping, MatchStrategy, SourceSystem, SourceTerm, TargetConcept};
//!
//! let term = SourceTerm::new("AAA.1", "jvaraH", SourceSystem::Ayurveda).with_english_name("fever");
//! let concept = TargetConcept::new("SR1", "Fever, unspecified");
//!
//! let mapping = Mapping::new(&term.code, &concept.code, MatchStrategy::SubstringName);
//! assert_eq!(mapping.equivalence, Equivalence::RelatedTo);
//!
//! assert_eq!(normalize("SR10  (TM2)"), "SR10 (TM2)");
//! ```

#![warn(missing_docs)]

mod concept;
mod mapping;
mod normalize;
mod term;
pub mod well_known;

// Re-export all public types at crate root
pub use concept::TargetConcept;
pub use mapping::{Equivalence, Mapping, MatchStrategy, UnknownEquivalence};
pub use normalize::{is_normalized, normalize, normalize_opt, NBSP};
pub use term::{SourceSystem, SourceTerm, UnknownSourceSystem};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_are_exported() {
        let _term = SourceTerm::new("AAA", "vAtaH", SourceSystem::Ayurveda);
        let _concept = TargetConcept::new("SR10", "Vata pattern");
        let _eq = Equivalence::Equivalent;
        let _strategy = MatchStrategy::ExactCode;
    }

    #[test]
    fn test_well_known_accessible() {
        assert_eq!(well_known::SOURCE_SYSTEM, "NAMASTE");
        assert_eq!(well_known::ANNOTATION_MARKER, " (");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let mapping = Mapping::new("SR10 (TM2)", "SR10", MatchStrategy::AnnotationPrefix);

        let json = serde_json::to_string(&mapping).unwrap();
        assert!(json.contains("\"equivalence\":\"equivalent\""));
        let parsed: Mapping = serde_json::from_str(&json).unwrap();
        assert_eq!(mapping, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_relatedto_spelling() {
        let json = serde_json::to_string(&Equivalence::RelatedTo).unwrap();
        assert_eq!(json, "\"relatedto\"");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_missing_strategy() {
        let json = r#"{"source_system":"NAMASTE","source_code":"A","target_system":"ICD-11 TM2","target_code":"B","equivalence":"relatedto"}"#;
        let parsed: Mapping = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.strategy, None);
        assert_eq!(parsed.equivalence, Equivalence::RelatedTo);
    }
}
