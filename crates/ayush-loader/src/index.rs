//! Target catalog matching index.
//!
//! [`MatchingEngine`] is the capability the mapping pipeline matches against:
//! exact code lookup, code prefix lookup and free-text title search, plus the
//! two title comparisons used by the name strategies. [`TargetIndex`] is the
//! in-memory implementation built over a slice of [`TargetConcept`]s.

use std::collections::HashMap;

use ayush_types::{normalize, TargetConcept};
use thiserror::Error;

/// Errors raised for free-text queries that are not valid search syntax.
///
/// These are per-query failures: the pipeline skips the offending term and
/// keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextSearchError {
    /// The query contains a character reserved by the query syntax.
    #[error("reserved character '{character}' in search query '{query}'")]
    ReservedCharacter {
        /// The rejected query.
        query: String,
        /// The first offending character.
        character: char,
    },

    /// The query consists of a bare boolean operator.
    #[error("bare operator '{keyword}' in search query '{query}'")]
    OperatorKeyword {
        /// The rejected query.
        query: String,
        /// The operator keyword.
        keyword: String,
    },
}

/// Operators that may not appear as bare query words.
const OPERATOR_KEYWORDS: &[&str] = &["AND", "OR", "NOT"];

/// Matching capability over the target catalog.
///
/// Implementations return concepts in catalog order without duplicates.
pub trait MatchingEngine {
    /// Number of coded concepts the engine matches against.
    fn concept_count(&self) -> usize;

    /// Concepts whose normalized code equals the normalized `code`.
    fn exact_match(&self, code: &str) -> Vec<&TargetConcept>;

    /// Concepts whose normalized code starts with the normalized `code_prefix`.
    fn pattern_match(&self, code_prefix: &str) -> Vec<&TargetConcept>;

    /// Concepts whose title contains every token of `term`.
    fn text_search(&self, term: &str) -> Result<Vec<&TargetConcept>, TextSearchError>;

    /// Concepts whose trimmed title equals the trimmed `name`, ignoring case.
    fn title_equals(&self, name: &str) -> Vec<&TargetConcept>;

    /// Concepts whose title contains `fragment`, ignoring case.
    fn title_contains(&self, fragment: &str) -> Vec<&TargetConcept>;
}

/// Splits text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Validates a free-text query and returns its tokens.
///
/// Words may contain alphanumerics, underscores and non-ASCII characters;
/// any other character, or a word that is a bare operator, is a syntax error.
pub fn parse_query(query: &str) -> Result<Vec<String>, TextSearchError> {
    if let Some(character) = query
        .chars()
        .find(|c| !(c.is_alphanumeric() || c.is_whitespace() || *c == '_' || !c.is_ascii()))
    {
        return Err(TextSearchError::ReservedCharacter {
            query: query.to_string(),
            character,
        });
    }

    if let Some(keyword) = query
        .split_whitespace()
        .find(|word| OPERATOR_KEYWORDS.contains(word))
    {
        return Err(TextSearchError::OperatorKeyword {
            query: query.to_string(),
            keyword: keyword.to_string(),
        });
    }

    Ok(tokenize(query))
}

/// In-memory [`MatchingEngine`] over a target catalog.
///
/// Concepts without a code are never indexed.
#[derive(Debug)]
pub struct TargetIndex<'a> {
    concepts: &'a [TargetConcept],
    /// Positions of coded concepts, in catalog order.
    coded: Vec<usize>,
    by_code: HashMap<String, Vec<usize>>,
    by_title: HashMap<String, Vec<usize>>,
    by_token: HashMap<String, Vec<usize>>,
    lowered_titles: Vec<String>,
}

impl<'a> TargetIndex<'a> {
    /// Builds the index.
    pub fn new(concepts: &'a [TargetConcept]) -> Self {
        let mut coded = Vec::with_capacity(concepts.len());
        let mut by_code: HashMap<String, Vec<usize>> = HashMap::with_capacity(concepts.len());
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::with_capacity(concepts.len());
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
        let mut lowered_titles = Vec::with_capacity(concepts.len());

        for (i, concept) in concepts.iter().enumerate() {
            let lowered = concept.title.to_lowercase();

            if concept.is_coded() {
                coded.push(i);
                by_code.entry(normalize(&concept.code)).or_default().push(i);
                by_title
                    .entry(lowered.trim().to_string())
                    .or_default()
                    .push(i);

                let mut tokens = tokenize(&lowered);
                tokens.sort_unstable();
                tokens.dedup();
                for token in tokens {
                    by_token.entry(token).or_default().push(i);
                }
            }

            lowered_titles.push(lowered);
        }

        Self {
            concepts,
            coded,
            by_code,
            by_title,
            by_token,
            lowered_titles,
        }
    }

    /// Number of coded concepts in the index.
    pub fn len(&self) -> usize {
        self.coded.len()
    }

    /// Returns true if no coded concept was indexed.
    pub fn is_empty(&self) -> bool {
        self.coded.is_empty()
    }

    fn resolve(&self, positions: &[usize]) -> Vec<&'a TargetConcept> {
        positions.iter().map(|&i| &self.concepts[i]).collect()
    }
}

impl<'a> MatchingEngine for TargetIndex<'a> {
    fn concept_count(&self) -> usize {
        self.coded.len()
    }

    fn exact_match(&self, code: &str) -> Vec<&TargetConcept> {
        let code = normalize(code);
        if code.is_empty() {
            return Vec::new();
        }
        self.by_code
            .get(&code)
            .map(|positions| self.resolve(positions))
            .unwrap_or_default()
    }

    fn pattern_match(&self, code_prefix: &str) -> Vec<&TargetConcept> {
        let prefix = normalize(code_prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        self.coded
            .iter()
            .map(|&i| &self.concepts[i])
            .filter(|c| normalize(&c.code).starts_with(&prefix))
            .collect()
    }

    fn text_search(&self, term: &str) -> Result<Vec<&TargetConcept>, TextSearchError> {
        let tokens = parse_query(term)?;
        let Some((first, rest)) = tokens.split_first() else {
            return Ok(Vec::new());
        };

        let Some(candidates) = self.by_token.get(first) else {
            return Ok(Vec::new());
        };

        let matches: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| {
                rest.iter().all(|token| {
                    self.by_token
                        .get(token)
                        .is_some_and(|postings| postings.binary_search(&i).is_ok())
                })
            })
            .collect();

        Ok(self.resolve(&matches))
    }

    fn title_equals(&self, name: &str) -> Vec<&TargetConcept> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Vec::new();
        }
        self.by_title
            .get(&key)
            .map(|positions| self.resolve(positions))
            .unwrap_or_default()
    }

    fn title_contains(&self, fragment: &str) -> Vec<&TargetConcept> {
        let needle = fragment.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.coded
            .iter()
            .copied()
            .filter(|&i| self.lowered_titles[i].contains(&needle))
            .map(|i| &self.concepts[i])
            .collect()
    }
}
