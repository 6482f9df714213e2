//! Mapping sets and the run-local builder that produces them.

use std::collections::{BTreeMap, HashMap, HashSet};

use ayush_types::{normalize, Equivalence, Mapping};

/// Mapping counts per equivalence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EquivalenceCounts {
    /// `equivalent` rows.
    pub equivalent: usize,
    /// `relatedto` rows.
    pub related_to: usize,
    /// `wider` rows.
    pub wider: usize,
    /// `narrower` rows.
    pub narrower: usize,
}

impl EquivalenceCounts {
    /// Total across all equivalences.
    pub fn total(&self) -> usize {
        self.equivalent + self.related_to + self.wider + self.narrower
    }

    fn add(&mut self, equivalence: Equivalence) {
        match equivalence {
            Equivalence::Equivalent => self.equivalent += 1,
            Equivalence::RelatedTo => self.related_to += 1,
            Equivalence::Wider => self.wider += 1,
            Equivalence::Narrower => self.narrower += 1,
        }
    }
}

/// An immutable, ordered set of mappings unique on `(source_code, target_code)`.
///
/// Iteration order is `(source_code, target_code)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSet {
    mappings: Vec<Mapping>,
    /// Exact source code -> positions.
    by_source: HashMap<String, Vec<usize>>,
    /// ASCII-lowercased source code -> positions, ordered for prefix scans.
    by_folded_source: BTreeMap<String, Vec<usize>>,
}

impl MappingSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary rows. Rows repeating an earlier
    /// `(source_code, target_code)` pair are discarded.
    pub fn from_mappings(mappings: impl IntoIterator<Item = Mapping>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<Mapping> = mappings
            .into_iter()
            .filter(|m| seen.insert((m.source_code.clone(), m.target_code.clone())))
            .collect();

        unique.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut by_source: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_folded_source: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, mapping) in unique.iter().enumerate() {
            by_source
                .entry(mapping.source_code.clone())
                .or_default()
                .push(i);
            by_folded_source
                .entry(mapping.source_code.to_ascii_lowercase())
                .or_default()
                .push(i);
        }

        Self {
            mappings: unique,
            by_source,
            by_folded_source,
        }
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if the set holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mappings in `(source_code, target_code)` order.
    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    /// Mappings as a slice.
    pub fn as_slice(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Returns true if the pair is present.
    pub fn contains(&self, source_code: &str, target_code: &str) -> bool {
        self.by_source
            .get(source_code)
            .is_some_and(|ix| ix.iter().any(|&i| self.mappings[i].target_code == target_code))
    }

    /// Mappings whose source code equals `source_code` exactly.
    pub fn for_source(&self, source_code: &str) -> Vec<&Mapping> {
        self.by_source
            .get(source_code)
            .map(|ix| ix.iter().map(|&i| &self.mappings[i]).collect())
            .unwrap_or_default()
    }

    /// Mappings whose source code starts with `prefix`, ignoring ASCII case.
    pub fn for_source_prefix_ignore_case(&self, prefix: &str) -> Vec<&Mapping> {
        let folded = prefix.to_ascii_lowercase();
        let mut positions: Vec<usize> = self
            .by_folded_source
            .range(folded.clone()..)
            .take_while(|(code, _)| code.starts_with(&folded))
            .flat_map(|(_, ix)| ix.iter().copied())
            .collect();
        positions.sort_unstable();
        positions.into_iter().map(|i| &self.mappings[i]).collect()
    }

    /// Mappings whose source code equals `source_code`, ignoring ASCII case.
    pub fn for_source_ignore_case(&self, source_code: &str) -> Vec<&Mapping> {
        self.by_folded_source
            .get(&source_code.to_ascii_lowercase())
            .map(|ix| ix.iter().map(|&i| &self.mappings[i]).collect())
            .unwrap_or_default()
    }

    /// Distinct source codes, sorted.
    pub fn source_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.mappings.iter().map(|m| m.source_code.as_str()).collect();
        codes.dedup();
        codes
    }

    /// Number of distinct target codes.
    pub fn unique_target_count(&self) -> usize {
        self.mappings
            .iter()
            .map(|m| m.target_code.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Counts mappings per equivalence.
    pub fn count_by_equivalence(&self) -> EquivalenceCounts {
        let mut counts = EquivalenceCounts::default();
        for mapping in &self.mappings {
            counts.add(mapping.equivalence);
        }
        counts
    }
}

impl<'a> IntoIterator for &'a MappingSet {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Outcome of the normalization repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RepairStats {
    /// Rows whose codes changed under normalization and were kept.
    pub repaired: usize,
    /// Rows dropped because their normalized pair collided with an earlier row.
    pub dropped: usize,
}

/// Accumulates accepted mappings for one pipeline run.
///
/// Acceptance is keyed on the raw `(source_code, target_code)` pair; the
/// first row for a pair wins.
#[derive(Debug, Default)]
pub struct MappingSetBuilder {
    accepted: Vec<Mapping>,
    seen: HashSet<(String, String)>,
    normalized: HashSet<(String, String)>,
    rejected: usize,
}

impl MappingSetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the mapping unless its pair was already accepted.
    /// Returns whether it was accepted.
    pub fn try_accept(&mut self, mapping: Mapping) -> bool {
        if self.contains(&mapping.source_code, &mapping.target_code) {
            self.rejected += 1;
            return false;
        }
        self.seen
            .insert((mapping.source_code.clone(), mapping.target_code.clone()));
        self.normalized
            .insert(normalized_key(&mapping.source_code, &mapping.target_code));
        self.accepted.push(mapping);
        true
    }

    /// Returns true if the raw pair has been accepted.
    pub fn contains(&self, source_code: &str, target_code: &str) -> bool {
        self.seen
            .contains(&(source_code.to_string(), target_code.to_string()))
    }

    /// Returns true if an accepted row has the same pair after normalization.
    pub fn contains_normalized(&self, source_code: &str, target_code: &str) -> bool {
        self.normalized
            .contains(&normalized_key(source_code, target_code))
    }

    /// Number of accepted rows.
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    /// Returns true if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Number of candidates rejected as duplicates.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Runs the repair pass and freezes the set.
    ///
    /// Every row's codes are normalized; a row whose normalized pair matches
    /// an earlier row's is dropped.
    pub fn finish(self) -> (MappingSet, RepairStats) {
        let mut stats = RepairStats::default();
        let mut seen = HashSet::with_capacity(self.accepted.len());
        let mut kept = Vec::with_capacity(self.accepted.len());

        for mut mapping in self.accepted {
            let (source_code, target_code) =
                normalized_key(&mapping.source_code, &mapping.target_code);
            let changed = source_code != mapping.source_code || target_code != mapping.target_code;

            if !seen.insert((source_code.clone(), target_code.clone())) {
                stats.dropped += 1;
                continue;
            }

            if changed {
                stats.repaired += 1;
                mapping.source_code = source_code;
                mapping.target_code = target_code;
            }
            kept.push(mapping);
        }

        (MappingSet::from_mappings(kept), stats)
    }
}

/// The pair the repair pass compares rows by.
pub(crate) fn normalized_key(source_code: &str, target_code: &str) -> (String, String) {
    (normalize(source_code), normalize(target_code))
}
