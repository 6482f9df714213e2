//! ICD-11 TM2 target concept type.

/// A standardized classification code from the ICD-11 catalog.
///
/// # Examples
///
/// ```
/// use ayush_types::TargetConcept;
///
/// let concept = TargetConcept::new("SR1", "Fever, unspecified");
/// assert!(concept.is_coded());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetConcept {
    /// The ICD-11 code (e.g. `SR10`).
    pub code: String,
    /// The English title of the entity.
    pub title: String,
}

impl TargetConcept {
    /// Creates a new target concept.
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }

    /// Returns true if the concept has a non-blank code.
    ///
    /// Chapter and block headings in the ICD-11 export carry no code and are
    /// never mapping targets.
    pub fn is_coded(&self) -> bool {
        !self.code.trim().is_empty()
    }
}
