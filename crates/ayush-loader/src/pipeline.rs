//! The mapping pipeline.
//!
//! Runs the five matching strategies in a fixed order against a
//! [`MatchingEngine`], accepting each candidate pair only if no earlier
//! candidate produced the same `(source_code, target_code)`. Two strategies
//! are capped; their new candidates are sorted by pair before truncation so
//! the surviving subset does not depend on catalog order. Capped strategies
//! compare normalized pairs, so the cap only counts rows that survive the
//! repair pass.
//!
//! Candidate generation for a strategy may run in parallel (feature
//! `parallel`); acceptance is always a single ordered pass.

use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use ayush_types::{normalize, Mapping, MatchStrategy, SourceTerm, TargetConcept};
use tracing::{debug, info};

use crate::index::{MatchingEngine, TargetIndex, TextSearchError};
use crate::mapping_set::{
    normalized_key, EquivalenceCounts, MappingSet, MappingSetBuilder, RepairStats,
};
use crate::store::CatalogSource;
use crate::types::{CatalogResult, MapperConfig};

/// A `(source_code, target_code)` candidate borrowed from the catalogs.
type Pair<'a> = (&'a str, &'a str);

/// Per-strategy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrategyReport {
    /// The strategy.
    pub strategy: MatchStrategy,
    /// Candidate pairs produced.
    pub candidates: usize,
    /// Pairs accepted into the run.
    pub accepted: usize,
    /// Candidates rejected because the pair was already accepted.
    pub duplicates: usize,
    /// New candidates cut by the strategy's cap.
    pub truncated: usize,
    /// Source terms whose name was not a valid search query.
    pub invalid_queries: usize,
}

impl StrategyReport {
    fn new(strategy: MatchStrategy) -> Self {
        Self {
            strategy,
            candidates: 0,
            accepted: 0,
            duplicates: 0,
            truncated: 0,
            invalid_queries: 0,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PipelineReport {
    /// Source terms considered.
    pub source_terms: usize,
    /// Coded target concepts considered.
    pub target_concepts: usize,
    /// Counters per strategy, in execution order.
    pub strategies: Vec<StrategyReport>,
    /// Outcome of the normalization repair pass.
    pub repair: RepairStats,
    /// Final counts per equivalence.
    pub totals: EquivalenceCounts,
}

impl PipelineReport {
    /// Pairs accepted by a strategy before the repair pass.
    pub fn accepted(&self, strategy: MatchStrategy) -> usize {
        self.strategies
            .iter()
            .find(|s| s.strategy == strategy)
            .map_or(0, |s| s.accepted)
    }

    /// Duplicates dropped during acceptance and by the repair pass.
    pub fn duplicates_dropped(&self) -> usize {
        self.strategies.iter().map(|s| s.duplicates).sum::<usize>() + self.repair.dropped
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct MappingRun {
    /// The new mapping set.
    pub set: MappingSet,
    /// Run counters.
    pub report: PipelineReport,
}

/// Computes NAMASTE to ICD-11 TM2 mappings from full catalog scans.
#[derive(Debug, Clone, Default)]
pub struct MappingPipeline {
    config: MapperConfig,
}

impl MappingPipeline {
    /// Creates a pipeline with the given configuration.
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Loads the configured catalogs from `catalogs` and generates mappings.
    ///
    /// # Errors
    /// Fails if a catalog cannot be provided; nothing is produced in that case.
    pub fn run(&self, catalogs: &dyn CatalogSource) -> CatalogResult<MappingRun> {
        let sources = catalogs.source_terms(&self.config.source_systems)?;
        let targets = catalogs.target_concepts()?;
        Ok(self.generate_mappings(&sources, &targets))
    }

    /// Generates mappings using the in-memory [`TargetIndex`].
    pub fn generate_mappings(&self, sources: &[SourceTerm], targets: &[TargetConcept]) -> MappingRun {
        let index = TargetIndex::new(targets);
        self.generate_with_engine(sources, &index)
    }

    /// Generates mappings against any matching engine.
    pub fn generate_with_engine<E>(&self, sources: &[SourceTerm], engine: &E) -> MappingRun
    where
        E: MatchingEngine + Sync,
    {
        let sources: Vec<&SourceTerm> = sources
            .iter()
            .filter(|s| !normalize(&s.code).is_empty())
            .collect();

        let mut builder = MappingSetBuilder::new();
        let mut strategies = Vec::with_capacity(MatchStrategy::ORDER.len());

        for strategy in MatchStrategy::ORDER {
            let mut report = StrategyReport::new(strategy);
            let candidates = self.candidates(strategy, &sources, engine, &mut report);
            report.candidates = candidates.len();

            match self.cap(strategy) {
                Some(limit) => self.accept_capped(strategy, candidates, limit, &mut builder, &mut report),
                None => self.accept_all(strategy, candidates, &mut builder, &mut report),
            }

            info!(
                strategy = strategy.id(),
                name = strategy.name(),
                candidates = report.candidates,
                accepted = report.accepted,
                truncated = report.truncated,
                "Strategy complete"
            );
            strategies.push(report);
        }

        let (set, repair) = builder.finish();
        let totals = set.count_by_equivalence();

        info!(
            total = set.len(),
            equivalent = totals.equivalent,
            related = totals.related_to,
            repaired = repair.repaired,
            dropped = repair.dropped,
            "Mapping run complete"
        );

        MappingRun {
            set,
            report: PipelineReport {
                source_terms: sources.len(),
                target_concepts: engine.concept_count(),
                strategies,
                repair,
                totals,
            },
        }
    }

    fn cap(&self, strategy: MatchStrategy) -> Option<usize> {
        match strategy {
            MatchStrategy::SingleToken => Some(self.config.single_token_limit),
            MatchStrategy::SubstringName => Some(self.config.substring_limit),
            _ => None,
        }
    }

    fn make_mapping(&self, pair: Pair<'_>, strategy: MatchStrategy) -> Mapping {
        Mapping::new(pair.0, pair.1, strategy)
            .with_systems(&self.config.source_system, &self.config.target_system)
    }

    fn accept_all(
        &self,
        strategy: MatchStrategy,
        candidates: Vec<Pair<'_>>,
        builder: &mut MappingSetBuilder,
        report: &mut StrategyReport,
    ) {
        for pair in candidates {
            if builder.try_accept(self.make_mapping(pair, strategy)) {
                report.accepted += 1;
            } else {
                report.duplicates += 1;
            }
        }
    }

    fn accept_capped(
        &self,
        strategy: MatchStrategy,
        candidates: Vec<Pair<'_>>,
        limit: usize,
        builder: &mut MappingSetBuilder,
        report: &mut StrategyReport,
    ) {
        let total = candidates.len();
        let mut fresh: Vec<Pair<'_>> = candidates
            .into_iter()
            .filter(|(s, t)| !builder.contains_normalized(s, t))
            .collect();
        fresh.sort_unstable();
        let mut keys = HashSet::with_capacity(fresh.len());
        fresh.retain(|(s, t)| keys.insert(normalized_key(s, t)));
        report.duplicates += total - fresh.len();

        if fresh.len() > limit {
            report.truncated = fresh.len() - limit;
            fresh.truncate(limit);
        }

        for pair in fresh {
            if builder.try_accept(self.make_mapping(pair, strategy)) {
                report.accepted += 1;
            }
        }
    }

    fn candidates<'a, E>(
        &self,
        strategy: MatchStrategy,
        sources: &[&'a SourceTerm],
        engine: &'a E,
        report: &mut StrategyReport,
    ) -> Vec<Pair<'a>>
    where
        E: MatchingEngine + Sync,
    {
        let probes = match strategy {
            MatchStrategy::ExactCode => probe(sources, |s| Ok(exact_code(s, engine))),
            MatchStrategy::AnnotationPrefix => probe(sources, |s| Ok(annotation_prefix(s, engine))),
            MatchStrategy::SingleToken => probe(sources, |s| single_token(s, engine, &self.config)),
            MatchStrategy::ExactName => probe(sources, |s| Ok(exact_name(s, engine))),
            MatchStrategy::SubstringName => probe(sources, |s| Ok(substring_name(s, engine, &self.config))),
        };

        let mut pairs = Vec::new();
        for (source, probed) in sources.iter().zip(probes) {
            match probed {
                Ok(found) => pairs.extend(found),
                Err(e) => {
                    debug!(source_code = %source.code, error = %e, "Skipping invalid search term");
                    report.invalid_queries += 1;
                }
            }
        }
        pairs
    }
}

/// Runs `f` for every source, preserving source order.
fn probe<'a, F>(sources: &[&'a SourceTerm], f: F) -> Vec<Result<Vec<Pair<'a>>, TextSearchError>>
where
    F: Fn(&'a SourceTerm) -> Result<Vec<Pair<'a>>, TextSearchError> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        sources.par_iter().map(|&s| f(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        sources.iter().map(|&s| f(s)).collect()
    }
}

fn pairs<'a>(source: &'a SourceTerm, targets: Vec<&'a TargetConcept>) -> Vec<Pair<'a>> {
    targets
        .into_iter()
        .map(|t| (source.code.as_str(), t.code.as_str()))
        .collect()
}

fn exact_code<'a, E: MatchingEngine>(source: &'a SourceTerm, engine: &'a E) -> Vec<Pair<'a>> {
    pairs(source, engine.exact_match(&source.code))
}

fn annotation_prefix<'a, E: MatchingEngine>(
    source: &'a SourceTerm,
    engine: &'a E,
) -> Vec<Pair<'a>> {
    let code = normalize(&source.code);
    let Some(pos) = code.find(ayush_types::well_known::ANNOTATION_MARKER) else {
        return Vec::new();
    };
    let bare = code[..pos].trim();
    if bare.is_empty() {
        return Vec::new();
    }
    pairs(source, engine.exact_match(bare))
}

fn single_token<'a, E: MatchingEngine>(
    source: &'a SourceTerm,
    engine: &'a E,
    config: &MapperConfig,
) -> Result<Vec<Pair<'a>>, TextSearchError> {
    let Some(name) = source.english_name.as_deref() else {
        return Ok(Vec::new());
    };
    let trimmed = name.trim();
    if !config.single_token_length.contains(trimmed.chars().count())
        || name.contains([' ', '/', '-'])
    {
        return Ok(Vec::new());
    }
    Ok(pairs(source, engine.text_search(trimmed)?))
}

fn exact_name<'a, E: MatchingEngine>(source: &'a SourceTerm, engine: &'a E) -> Vec<Pair<'a>> {
    let mut found: Vec<&TargetConcept> = Vec::new();
    for name in source.english_names() {
        for target in engine.title_equals(name) {
            if !found.iter().any(|f| std::ptr::eq(*f, target)) {
                found.push(target);
            }
        }
    }
    pairs(source, found)
}

fn substring_name<'a, E: MatchingEngine>(
    source: &'a SourceTerm,
    engine: &'a E,
    config: &MapperConfig,
) -> Vec<Pair<'a>> {
    let Some(name) = source.english_name.as_deref() else {
        return Vec::new();
    };
    let trimmed = name.trim();
    if !config.substring_length.contains(trimmed.chars().count()) {
        return Vec::new();
    }
    pairs(source, engine.title_contains(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayush_types::{Equivalence, SourceSystem};

    use crate::store::CatalogStore;

    fn make_source(code: &str, english: Option<&str>) -> SourceTerm {
        let term = SourceTerm::new(code, format!("term {code}"), SourceSystem::Ayurveda);
        match english {
            Some(name) => term.with_english_name(name),
            None => term,
        }
    }

    fn make_target(code: &str, title: &str) -> TargetConcept {
        TargetConcept::new(code, title)
    }

    #[test]
    fn test_end_to_end_single_token() {
        let sources = vec![make_source("AAA.1", Some("fever"))];
        let targets = vec![make_target("SR1", "Fever, unspecified")];

        let pipeline = MappingPipeline::default();
        let run = pipeline.generate_mappings(&sources, &targets);

        assert_eq!(run.set.len(), 1);
        let mapping = &run.set.as_slice()[0];
        assert_eq!(mapping.key(), ("AAA.1", "SR1"));
        assert_eq!(mapping.equivalence, Equivalence::RelatedTo);
        assert_eq!(mapping.strategy, Some(MatchStrategy::SingleToken));
        assert_eq!(mapping.source_system, "NAMASTE");
        assert_eq!(mapping.target_system, "ICD-11 TM2");
        assert_eq!(run.report.totals.related_to, 1);
        assert_eq!(run.report.totals.equivalent, 0);

        // A rerun reproduces the same set.
        let rerun = pipeline.generate_mappings(&sources, &targets);
        assert_eq!(run.set, rerun.set);
    }

    #[test]
    fn test_earlier_strategy_wins() {
        let sources = vec![make_source("SR2", Some("Headache"))];
        let targets = vec![make_target("SR2", "Headache")];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert_eq!(run.set.len(), 1);
        let mapping = &run.set.as_slice()[0];
        assert_eq!(mapping.equivalence, Equivalence::Equivalent);
        assert_eq!(mapping.strategy, Some(MatchStrategy::ExactCode));
        assert_eq!(run.report.accepted(MatchStrategy::ExactCode), 1);
        assert_eq!(run.report.accepted(MatchStrategy::ExactName), 0);
        assert!(run.report.duplicates_dropped() >= 2);
    }

    #[test]
    fn test_annotation_prefix_uses_first_marker() {
        let sources = vec![
            make_source("SR10 (TM2)", None),
            make_source("SR11 (TM2) (old)", None),
            make_source(" (TM2)", None),
        ];
        let targets = vec![
            make_target("SR10", "Vata pattern"),
            make_target("SR11", "Pitta pattern"),
            make_target("SR11 (TM2)", "Pitta pattern annotated"),
        ];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert!(run.set.contains("SR10 (TM2)", "SR10"));
        assert!(run.set.contains("SR11 (TM2) (old)", "SR11"));
        assert!(!run.set.contains("SR11 (TM2) (old)", "SR11 (TM2)"));
        assert_eq!(run.report.accepted(MatchStrategy::AnnotationPrefix), 2);
        assert!(run
            .set
            .iter()
            .all(|m| m.equivalence == Equivalence::Equivalent));
    }

    #[test]
    fn test_exact_name_uses_both_english_names() {
        let sources = vec![
            make_source("A1", Some("Common cold")),
            SourceTerm::new("A2", "term", SourceSystem::Ayurveda)
                .with_english_name("Indigestion of the stomach")
                .with_alternate_english_name(" dyspepsia "),
        ];
        let targets = vec![
            make_target("T1", "COMMON COLD"),
            make_target("T2", "Dyspepsia"),
        ];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert!(run.set.contains("A1", "T1"));
        assert!(run.set.contains("A2", "T2"));
        assert_eq!(run.report.accepted(MatchStrategy::ExactName), 2);
    }

    #[test]
    fn test_name_length_windows() {
        let sources = vec![
            // Too short for either name strategy.
            make_source("S1", Some("flu")),
            // Too long for single token, fits substring.
            make_source("S2", Some("Hyperpyrexiaaaaaaaaa")),
            // Contains a hyphen, so only substring applies.
            make_source("S3", Some("pitta-jvara")),
        ];
        let targets = vec![
            make_target("T1", "flu syndrome"),
            make_target("T2", "Hyperpyrexiaaaaaaaaa with chills"),
            make_target("T3", "Pitta-jvara disorder"),
        ];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert!(run.set.for_source("S1").is_empty());
        assert_eq!(
            run.set.for_source("S2")[0].strategy,
            Some(MatchStrategy::SubstringName)
        );
        assert_eq!(
            run.set.for_source("S3")[0].strategy,
            Some(MatchStrategy::SubstringName)
        );
        assert_eq!(run.report.accepted(MatchStrategy::SingleToken), 0);
    }

    #[test]
    fn test_invalid_search_term_is_skipped() {
        let sources = vec![
            make_source("S1", Some("jvara's")),
            make_source("S2", Some("cough")),
        ];
        let targets = vec![
            make_target("T1", "Cough"),
            make_target("T2", "Jvara's fever"),
        ];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        let single = run.report.strategies[2];
        assert_eq!(single.strategy, MatchStrategy::SingleToken);
        assert_eq!(single.invalid_queries, 1);
        assert!(run.set.contains("S2", "T1"));
        // The skipped term can still match by substring.
        assert!(run.set.contains("S1", "T2"));
    }

    #[test]
    fn test_cap_keeps_lowest_pairs() {
        let sources = vec![
            make_source("C3", Some("ache")),
            make_source("C1", Some("ache")),
            make_source("C2", Some("ache")),
        ];
        let targets = vec![make_target("T9", "Ache"), make_target("T1", "Ache of back")];

        let config = MapperConfig {
            single_token_limit: 3,
            ..Default::default()
        };
        let run = MappingPipeline::new(config).generate_mappings(&sources, &targets);

        let single = run.report.strategies[2];
        assert_eq!(single.candidates, 6);
        assert_eq!(single.accepted, 3);
        assert_eq!(single.truncated, 3);
        assert!(run.set.contains("C1", "T1"));
        assert!(run.set.contains("C1", "T9"));
        assert!(run.set.contains("C2", "T1"));
        assert_eq!(
            run.set
                .iter()
                .filter(|m| m.strategy == Some(MatchStrategy::SingleToken))
                .count(),
            3
        );

        // Pairs cut by the cap can still be found by a later strategy.
        assert_eq!(
            run.set.for_source("C3")[0].strategy,
            Some(MatchStrategy::ExactName)
        );
    }

    #[test]
    fn test_cap_skips_whitespace_variants() {
        let sources = vec![
            make_source("AAA.1 ", Some("fever")),
            make_source("AAA.1", Some("fever")),
            make_source("BBB.2", Some("fever")),
        ];
        let targets = vec![make_target("SR1", "Fever, unspecified")];

        let config = MapperConfig {
            single_token_limit: 2,
            ..Default::default()
        };
        let run = MappingPipeline::new(config).generate_mappings(&sources, &targets);

        let single = run.report.strategies[2];
        assert_eq!(single.candidates, 3);
        assert_eq!(single.accepted, 2);
        assert_eq!(single.duplicates, 1);
        assert_eq!(single.truncated, 0);
        assert_eq!(run.report.repair.dropped, 0);

        assert_eq!(run.set.len(), 2);
        assert!(run.set.contains("AAA.1", "SR1"));
        assert!(run.set.contains("BBB.2", "SR1"));
    }

    #[test]
    fn test_pairs_are_unique() {
        let sources = vec![
            make_source("SR1", Some("Fever")),
            make_source("SR1", Some("Fever")),
        ];
        let targets = vec![make_target("SR1", "Fever"), make_target("SR1", "Fever")];

        let run = MappingPipeline::new(MapperConfig::uncapped()).generate_mappings(&sources, &targets);

        assert_eq!(run.set.len(), 1);
        assert_eq!(run.set.as_slice()[0].strategy, Some(MatchStrategy::ExactCode));
    }

    #[test]
    fn test_repair_pass_collapses_whitespace_variants() {
        let sources = vec![
            make_source("SR10  (TM2)", None),
            make_source("SR10 (TM2)", None),
        ];
        let targets = vec![make_target("SR10", "Vata pattern")];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert_eq!(run.report.accepted(MatchStrategy::AnnotationPrefix), 2);
        assert_eq!(run.report.repair.dropped, 1);
        assert_eq!(run.set.len(), 1);
        assert!(run.set.contains("SR10 (TM2)", "SR10"));
    }

    #[test]
    fn test_blank_codes_are_ignored() {
        let sources = vec![make_source("  ", Some("fever"))];
        let targets = vec![make_target("", "Fever"), make_target("SR1", "Fever")];

        let run = MappingPipeline::default().generate_mappings(&sources, &targets);

        assert!(run.set.is_empty());
        assert_eq!(run.report.source_terms, 0);
        assert_eq!(run.report.target_concepts, 1);
    }

    #[test]
    fn test_run_fails_without_catalogs() {
        let store = CatalogStore::new();
        assert!(MappingPipeline::default().run(&store).is_err());

        let mut store = CatalogStore::new();
        store.insert_source_terms(
            SourceSystem::Ayurveda,
            [make_source("AAA.1", Some("fever"))],
        );
        store.insert_target_concepts([make_target("SR1", "Fever, unspecified")]);

        let run = MappingPipeline::default().run(&store).unwrap();
        assert_eq!(run.set.len(), 1);
    }
}
