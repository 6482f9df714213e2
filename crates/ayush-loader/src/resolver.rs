//! Point lookups against the published mapping set.
//!
//! Queries are normalized and then matched by four patterns in priority
//! order; the first pattern with any hit decides the result:
//!
//! 1. stored code equals the query
//! 2. stored code starts with `query(`
//! 3. stored code starts with `query ` (e.g. `SR10` finds `SR10 (TM2)`)
//! 4. query starts with `stored(`
//!
//! Patterns 2-4 ignore ASCII case.

use std::sync::Arc;

use ayush_types::well_known::{placeholder_display, ANNOTATION_OPEN};
use ayush_types::{normalize, Mapping};

use crate::mapping_set::MappingSet;
use crate::mapping_store::MappingRepository;
use crate::store::TermLookup;
use crate::types::MapperConfig;

/// A mapping annotated with human-readable displays.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResolvedMapping {
    /// The stored mapping.
    pub mapping: Mapping,
    /// Source display term, or a synthesized placeholder.
    pub source_display: String,
    /// Target title, or a synthesized placeholder.
    pub target_display: String,
}

/// Resolves lookup queries against the currently published mappings.
#[derive(Clone)]
pub struct LookupResolver {
    mappings: Arc<dyn MappingRepository>,
    terms: Arc<dyn TermLookup + Send + Sync>,
    source_label: String,
    target_label: String,
}

impl std::fmt::Debug for LookupResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupResolver")
            .field("mappings", &self.mappings.snapshot().len())
            .field("source_label", &self.source_label)
            .field("target_label", &self.target_label)
            .finish()
    }
}

impl LookupResolver {
    /// Creates a resolver over a mapping repository and a display source.
    pub fn new(
        mappings: Arc<dyn MappingRepository>,
        terms: Arc<dyn TermLookup + Send + Sync>,
        config: &MapperConfig,
    ) -> Self {
        Self {
            mappings,
            terms,
            source_label: config.source_display_label.clone(),
            target_label: config.target_display_label.clone(),
        }
    }

    /// Returns all mappings matching `query`, ordered by
    /// `(source_code, target_code)`. Blank or unknown queries yield nothing.
    pub fn resolve_mappings(&self, query: &str) -> Vec<ResolvedMapping> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let set = self.mappings.snapshot();
        find_mappings(&set, &query)
            .into_iter()
            .map(|mapping| self.annotate(mapping.clone()))
            .collect()
    }

    /// Native display term of a source code.
    pub fn lookup_display_name(&self, code: &str) -> Option<String> {
        self.terms.lookup_display_name(code)
    }

    /// Title of a target code.
    pub fn lookup_target_title(&self, code: &str) -> Option<String> {
        self.terms.lookup_target_title(code)
    }

    /// Distinct source codes of the published set, sorted.
    pub fn list_source_codes(&self) -> Vec<String> {
        self.mappings
            .snapshot()
            .source_codes()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn annotate(&self, mapping: Mapping) -> ResolvedMapping {
        let source_display = self
            .terms
            .lookup_display_name(&mapping.source_code)
            .unwrap_or_else(|| placeholder_display(&self.source_label, &mapping.source_code));
        let target_display = self
            .terms
            .lookup_target_title(&mapping.target_code)
            .unwrap_or_else(|| placeholder_display(&self.target_label, &mapping.target_code));

        ResolvedMapping {
            mapping,
            source_display,
            target_display,
        }
    }
}

/// Applies the lookup patterns to a normalized, non-empty query.
fn find_mappings<'s>(set: &'s MappingSet, query: &str) -> Vec<&'s Mapping> {
    let exact = set.for_source(query);
    if !exact.is_empty() {
        return exact;
    }

    let annotated = set.for_source_prefix_ignore_case(&format!("{query}{ANNOTATION_OPEN}"));
    if !annotated.is_empty() {
        return annotated;
    }

    let spaced = set.for_source_prefix_ignore_case(&format!("{query} "));
    if !spaced.is_empty() {
        return spaced;
    }

    let mut enclosing: Vec<&Mapping> = query
        .match_indices(ANNOTATION_OPEN)
        .flat_map(|(i, _)| set.for_source_ignore_case(&query[..i]))
        .collect();
    enclosing.sort_by(|a, b| a.key().cmp(&b.key()));
    enclosing.dedup_by(|a, b| a.key() == b.key());
    enclosing
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayush_types::{Equivalence, MatchStrategy, SourceSystem, SourceTerm, TargetConcept};

    use crate::mapping_store::MappingStore;
    use crate::store::CatalogStore;

    fn make_resolver(mappings: Vec<Mapping>) -> LookupResolver {
        let mut catalogs = CatalogStore::new();
        catalogs.insert_source_terms(
            SourceSystem::Ayurveda,
            [SourceTerm::new("SR10 (TM2)", "vAtasaFcayaH", SourceSystem::Ayurveda)],
        );
        catalogs.insert_target_concepts([TargetConcept::new("SR10", "Vata pattern (TM2)")]);

        let store = MappingStore::with_set(MappingSet::from_mappings(mappings));
        LookupResolver::new(Arc::new(store), Arc::new(catalogs), &MapperConfig::default())
    }

    fn codes(resolved: &[ResolvedMapping]) -> Vec<(&str, &str)> {
        resolved.iter().map(|r| r.mapping.key()).collect()
    }

    #[test]
    fn test_tolerant_lookup() {
        let resolver = make_resolver(vec![
            Mapping::new("SR10 (TM2)", "SR10", MatchStrategy::AnnotationPrefix),
            Mapping::new("SR10 (TM2)", "SR11", MatchStrategy::SubstringName),
        ]);

        let expected = vec![("SR10 (TM2)", "SR10"), ("SR10 (TM2)", "SR11")];
        for query in ["SR10", "SR10 (TM2)", "SR10  (TM2)", " SR10\u{00A0}(TM2) ", "sr10"] {
            let resolved = resolver.resolve_mappings(query);
            assert_eq!(codes(&resolved), expected, "query {query:?}");
        }
    }

    #[test]
    fn test_annotations() {
        let resolver = make_resolver(vec![
            Mapping::new("SR10 (TM2)", "SR10", MatchStrategy::AnnotationPrefix),
            Mapping::new("SR10 (TM2)", "SR99", MatchStrategy::SubstringName),
        ]);

        let resolved = resolver.resolve_mappings("SR10");
        assert_eq!(resolved[0].source_display, "vAtasaFcayaH");
        assert_eq!(resolved[0].target_display, "Vata pattern (TM2)");
        assert_eq!(resolved[0].mapping.equivalence, Equivalence::Equivalent);
        assert_eq!(resolved[1].target_display, "ICD-11 code SR99");
    }

    #[test]
    fn test_missing_source_display_uses_placeholder() {
        let resolver = make_resolver(vec![Mapping::new("AAA.1", "SR1", MatchStrategy::SingleToken)]);

        let resolved = resolver.resolve_mappings("AAA.1");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_display, "NAMASTE code AAA.1");
        assert_eq!(resolved[0].target_display, "ICD-11 code SR1");
    }

    #[test]
    fn test_exact_match_takes_priority() {
        let resolver = make_resolver(vec![
            Mapping::new("SR10", "T1", MatchStrategy::ExactCode),
            Mapping::new("SR10 (TM2)", "T2", MatchStrategy::AnnotationPrefix),
        ]);

        assert_eq!(codes(&resolver.resolve_mappings("SR10")), vec![("SR10", "T1")]);
    }

    #[test]
    fn test_unparenthesized_annotation() {
        let resolver = make_resolver(vec![
            Mapping::new("SR10(TM2)", "T1", MatchStrategy::ExactCode),
            Mapping::new("SR10 x", "T2", MatchStrategy::ExactCode),
        ]);

        // `query(` outranks `query `.
        assert_eq!(codes(&resolver.resolve_mappings("SR10")), vec![("SR10(TM2)", "T1")]);
    }

    #[test]
    fn test_query_with_extra_annotation() {
        let resolver = make_resolver(vec![Mapping::new("SR10", "T1", MatchStrategy::ExactCode)]);

        assert_eq!(
            codes(&resolver.resolve_mappings("sr10(legacy)")),
            vec![("SR10", "T1")]
        );
    }

    #[test]
    fn test_absent_and_blank_queries() {
        let resolver = make_resolver(vec![Mapping::new("SR10 (TM2)", "SR10", MatchStrategy::ExactCode)]);

        assert!(resolver.resolve_mappings("DOES-NOT-EXIST").is_empty());
        assert!(resolver.resolve_mappings("").is_empty());
        assert!(resolver.resolve_mappings(" \u{00A0} ").is_empty());
        assert!(resolver.resolve_mappings("SR1").is_empty());
    }

    #[test]
    fn test_list_and_display_lookups() {
        let resolver = make_resolver(vec![
            Mapping::new("B", "T1", MatchStrategy::ExactCode),
            Mapping::new("A", "T2", MatchStrategy::ExactCode),
            Mapping::new("A", "T1", MatchStrategy::ExactCode),
        ]);

        assert_eq!(resolver.list_source_codes(), vec!["A", "B"]);
        assert_eq!(
            resolver.lookup_display_name("SR10 (TM2)").as_deref(),
            Some("vAtasaFcayaH")
        );
        assert_eq!(
            resolver.lookup_target_title("SR10").as_deref(),
            Some("Vata pattern (TM2)")
        );
        assert_eq!(resolver.lookup_target_title("NOPE"), None);
    }

    #[test]
    fn test_sees_newly_published_set() {
        let store = Arc::new(MappingStore::new());
        let resolver = LookupResolver::new(
            store.clone(),
            Arc::new(CatalogStore::new()),
            &MapperConfig::default(),
        );
        assert!(resolver.resolve_mappings("A").is_empty());

        store.publish(MappingSet::from_mappings([Mapping::new(
            "A",
            "T",
            MatchStrategy::ExactCode,
        )]));
        assert_eq!(resolver.resolve_mappings("A").len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_resolved_mapping_json() {
        let resolver = make_resolver(vec![Mapping::new("SR10 (TM2)", "SR10", MatchStrategy::AnnotationPrefix)]);

        let resolved = resolver.resolve_mappings("SR10");
        let json = serde_json::to_value(&resolved[0]).unwrap();
        assert_eq!(json["mapping"]["equivalence"], "equivalent");
        assert_eq!(json["mapping"]["strategy"], "annotation_prefix");
        assert_eq!(json["source_display"], "vAtasaFcayaH");
        assert_eq!(json["target_display"], "Vata pattern (TM2)");
    }
}
