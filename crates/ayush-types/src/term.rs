//! NAMASTE source term type.
//!
//! This module provides the `SourceTerm` struct representing one row of a
//! NAMASTE morbidity catalog, and `SourceSystem` naming which catalog it
//! came from.

/// The traditional-medicine system a NAMASTE catalog belongs to.
///
/// # Examples
///
/// ```
/// use ayush_types::SourceSystem;
///
/// assert_eq!(SourceSystem::Ayurveda.as_str(), "ayurveda");
/// assert_eq!("unani".parse::<SourceSystem>(), Ok(SourceSystem::Unani));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SourceSystem {
    /// Ayurveda morbidity codes (NAMC).
    Ayurveda,
    /// Siddha morbidity codes.
    Siddha,
    /// Unani morbidity codes (NUMC).
    Unani,
}

impl SourceSystem {
    /// All systems, in catalog loading order.
    pub const ALL: [SourceSystem; 3] = [Self::Ayurveda, Self::Siddha, Self::Unani];

    /// Returns the lowercase system name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ayurveda => "ayurveda",
            Self::Siddha => "siddha",
            Self::Unani => "unani",
        }
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown source system name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSourceSystem(pub String);

impl std::fmt::Display for UnknownSourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown source system: '{}' (expected ayurveda, siddha or unani)",
            self.0
        )
    }
}

impl std::error::Error for UnknownSourceSystem {}

impl std::str::FromStr for SourceSystem {
    type Err = UnknownSourceSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ayurveda" => Ok(Self::Ayurveda),
            "siddha" => Ok(Self::Siddha),
            "unani" => Ok(Self::Unani),
            _ => Err(UnknownSourceSystem(s.to_string())),
        }
    }
}

/// A locally coded traditional-medicine term from a NAMASTE catalog.
///
/// # Examples
///
/// ```
/// use ayush_types::{SourceSystem, SourceTerm};
///
/// let term = SourceTerm::new("AAA.1", "vAtasaFcayaH", SourceSystem::Ayurveda)
///     .with_english_name("fever");
///
/// assert_eq!(term.english_name.as_deref(), Some("fever"));
/// assert!(!term.has_annotation());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceTerm {
    /// The NAMASTE code, as it appears in the catalog.
    pub code: String,
    /// Native-language term shown to users (`namc_term`).
    pub display_name: String,
    /// Plain-language English name (`name_english`).
    pub english_name: Option<String>,
    /// Secondary English name taken from the index (`name_english_under_index`).
    pub alternate_english_name: Option<String>,
    /// Free-text definition.
    pub definition: Option<String>,
    /// Catalog the term was loaded from.
    pub system: SourceSystem,
}

impl SourceTerm {
    /// Creates a term with only a code and display name.
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        system: SourceSystem,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            english_name: None,
            alternate_english_name: None,
            definition: None,
            system,
        }
    }

    /// Sets the English name.
    pub fn with_english_name(mut self, name: impl Into<String>) -> Self {
        self.english_name = Some(name.into());
        self
    }

    /// Sets the alternate English name.
    pub fn with_alternate_english_name(mut self, name: impl Into<String>) -> Self {
        self.alternate_english_name = Some(name.into());
        self
    }

    /// Sets the definition.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Returns true if the code carries a trailing `" ("` annotation.
    pub fn has_annotation(&self) -> bool {
        self.code.contains(crate::well_known::ANNOTATION_MARKER)
    }

    /// Returns the non-empty English names of this term (primary first).
    pub fn english_names(&self) -> impl Iterator<Item = &str> {
        [
            self.english_name.as_deref(),
            self.alternate_english_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|name| !name.trim().is_empty())
    }
}
