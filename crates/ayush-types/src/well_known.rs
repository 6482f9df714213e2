//! Well-known code system names, URIs and catalog markers.
//!
//! # Examples
//!
//! ```
//! use ayush_types::well_known;
//!
//! assert_eq!(well_known::SOURCE_SYSTEM, "NAMASTE");
//! assert_eq!(well_known::TARGET_SYSTEM, "ICD-11 TM2");
//! ```

// =============================================================================
// Code Systems
// =============================================================================

/// System name written into the `source_system` column of every mapping.
pub const SOURCE_SYSTEM: &str = "NAMASTE";

/// System name written into the `target_system` column of every mapping.
pub const TARGET_SYSTEM: &str = "ICD-11 TM2";

/// Canonical URI of the NAMASTE code system.
pub const SOURCE_SYSTEM_URI: &str = "http://namaste.terminology/CodeSystem";

/// Canonical URI of the ICD-11 MMS linearization (TM2 chapter included).
pub const TARGET_SYSTEM_URI: &str = "http://id.who.int/icd/release/11/mms";

// =============================================================================
// Display Fallbacks
// =============================================================================

/// Label used when synthesizing a source display, e.g. `NAMASTE code AAA.1`.
pub const SOURCE_DISPLAY_LABEL: &str = "NAMASTE";

/// Label used when synthesizing a target display, e.g. `ICD-11 code SR10`.
pub const TARGET_DISPLAY_LABEL: &str = "ICD-11";

// =============================================================================
// Code Structure
// =============================================================================

/// Marker that introduces a trailing parenthesized annotation in a source code.
///
/// `"SR10 (TM2)"` has the bare code `"SR10"` before the marker.
pub const ANNOTATION_MARKER: &str = " (";

/// Character that opens an annotation when it directly follows a code.
pub const ANNOTATION_OPEN: char = '(';

/// Builds the placeholder display used when a code has no catalog entry.
///
/// ```
/// use ayush_types::well_known::placeholder_display;
///
/// assert_eq!(placeholder_display("ICD-11", "SR10"), "ICD-11 code SR10");
/// ```
pub fn placeholder_display(label: &str, code: &str) -> String {
    format!("{} code {}", label, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_display() {
        assert_eq!(
            placeholder_display(SOURCE_DISPLAY_LABEL, "AAA.1"),
            "NAMASTE code AAA.1"
        );
        assert_eq!(
            placeholder_display(TARGET_DISPLAY_LABEL, "SR10"),
            "ICD-11 code SR10"
        );
    }

    #[test]
    fn test_annotation_marker_opens_with_paren() {
        assert!(ANNOTATION_MARKER.ends_with(ANNOTATION_OPEN));
    }
}
