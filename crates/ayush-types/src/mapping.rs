//! Concept mapping types.
//!
//! A [`Mapping`] links one NAMASTE source code to one ICD-11 target code with
//! an [`Equivalence`] label and the [`MatchStrategy`] that produced it.

/// Relationship strength between the two codes of a mapping.
///
/// The persisted vocabulary is lowercase (`"equivalent"`, `"relatedto"`).
/// `Wider` and `Narrower` are part of the vocabulary but the mapping
/// pipeline never emits them.
///
/// # Examples
///
/// ```
/// use ayush_types::Equivalence;
///
/// assert_eq!(Equivalence::RelatedTo.as_str(), "relatedto");
/// assert_eq!("equivalent".parse::<Equivalence>(), Ok(Equivalence::Equivalent));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Equivalence {
    /// Both codes denote the same concept.
    Equivalent,
    /// The codes are loosely associated.
    RelatedTo,
    /// The target is broader than the source.
    Wider,
    /// The target is narrower than the source.
    Narrower,
}

impl Equivalence {
    /// Returns the persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equivalent => "equivalent",
            Self::RelatedTo => "relatedto",
            Self::Wider => "wider",
            Self::Narrower => "narrower",
        }
    }

    /// Returns true for the labels the mapping pipeline is allowed to write.
    pub fn is_emitted(self) -> bool {
        matches!(self, Self::Equivalent | Self::RelatedTo)
    }
}

impl std::fmt::Display for Equivalence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown equivalence string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEquivalence(pub String);

impl std::fmt::Display for UnknownEquivalence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown equivalence: '{}'", self.0)
    }
}

impl std::error::Error for UnknownEquivalence {}

impl std::str::FromStr for Equivalence {
    type Err = UnknownEquivalence;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equivalent" => Ok(Self::Equivalent),
            "relatedto" => Ok(Self::RelatedTo),
            "wider" => Ok(Self::Wider),
            "narrower" => Ok(Self::Narrower),
            _ => Err(UnknownEquivalence(s.to_string())),
        }
    }
}

/// The matching heuristic that produced a mapping.
///
/// Strategies run in ascending [`id`](MatchStrategy::id) order; a pair
/// accepted by an earlier strategy is never relabelled by a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchStrategy {
    /// Source code equals target code.
    ExactCode,
    /// Source code before its `" ("` annotation equals target code.
    AnnotationPrefix,
    /// Single-word English name found as a token in a target title.
    SingleToken,
    /// English name equals a target title, ignoring case.
    ExactName,
    /// English name is a substring of a target title, ignoring case.
    SubstringName,
}

impl MatchStrategy {
    /// All strategies in execution order.
    pub const ORDER: [MatchStrategy; 5] = [
        Self::ExactCode,
        Self::AnnotationPrefix,
        Self::SingleToken,
        Self::ExactName,
        Self::SubstringName,
    ];

    /// Numeric provenance id (1-based execution position).
    pub fn id(self) -> u8 {
        match self {
            Self::ExactCode => 1,
            Self::AnnotationPrefix => 2,
            Self::SingleToken => 3,
            Self::ExactName => 4,
            Self::SubstringName => 5,
        }
    }

    /// Looks a strategy up by its numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ORDER.into_iter().find(|s| s.id() == id)
    }

    /// Equivalence label assigned to every mapping this strategy accepts.
    pub fn equivalence(self) -> Equivalence {
        match self {
            Self::ExactCode | Self::AnnotationPrefix | Self::ExactName => Equivalence::Equivalent,
            Self::SingleToken | Self::SubstringName => Equivalence::RelatedTo,
        }
    }

    /// Short human-readable name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::ExactCode => "exact code",
            Self::AnnotationPrefix => "code before annotation",
            Self::SingleToken => "single-token name",
            Self::ExactName => "exact English name",
            Self::SubstringName => "partial English name",
        }
    }
}

/// A stored cross-reference between a source code and a target code.
///
/// # Examples
///
/// ```
/// use ayush_types::{Equivalence, Mapping, MatchStrategy};
///
/// let mapping = Mapping::new("AAA.1", "SR1", MatchStrategy::SubstringName);
/// assert_eq!(mapping.equivalence, Equivalence::RelatedTo);
/// assert_eq!(mapping.source_system, "NAMASTE");
/// assert_eq!(mapping.key(), ("AAA.1", "SR1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mapping {
    /// Source code system name.
    pub source_system: String,
    /// NAMASTE code.
    pub source_code: String,
    /// Target code system name.
    pub target_system: String,
    /// ICD-11 code.
    pub target_code: String,
    /// Relationship strength.
    pub equivalence: Equivalence,
    /// Strategy that produced the mapping. `None` for rows read back from
    /// persisted storage, which does not record provenance.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub strategy: Option<MatchStrategy>,
}

impl Mapping {
    /// Creates a mapping between the default NAMASTE and ICD-11 TM2 systems.
    pub fn new(
        source_code: impl Into<String>,
        target_code: impl Into<String>,
        strategy: MatchStrategy,
    ) -> Self {
        Self {
            source_system: crate::well_known::SOURCE_SYSTEM.to_string(),
            source_code: source_code.into(),
            target_system: crate::well_known::TARGET_SYSTEM.to_string(),
            target_code: target_code.into(),
            equivalence: strategy.equivalence(),
            strategy: Some(strategy),
        }
    }

    /// Overrides the system names.
    pub fn with_systems(
        mut self,
        source_system: impl Into<String>,
        target_system: impl Into<String>,
    ) -> Self {
        self.source_system = source_system.into();
        self.target_system = target_system.into();
        self
    }

    /// The uniqueness key of a mapping set.
    pub fn key(&self) -> (&str, &str) {
        (&self.source_code, &self.target_code)
    }
}
