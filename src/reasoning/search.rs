//! Fuzzy search over reflections
//!
//! Scores are normalized approximate-substring edit distances: the fewest
//! edits needed to turn the pattern into *some* substring of a field, divided
//! by the pattern length. 0.0 is an exact match, 1.0 shares nothing. Queries
//! use `|` to separate terms. A record is eligible when any term scores within
//! the threshold against one of its fields, and is ranked by the mean over all
//! terms, with terms outside the threshold counting as 1.0.

use crate::types::Reflection;

/// A record with a fixed set of searchable text fields
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Reflection {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.task.as_str(), self.learning.as_str(), self.outcome.as_str()]
    }
}

/// Terms shorter than this are dropped when the query has longer ones
const MIN_TERM_CHARS: usize = 3;

/// Join whitespace-separated terms into an OR query
pub fn or_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join("|")
}

/// Ranks records against a query, dropping matches weaker than the threshold
#[derive(Debug, Clone, Copy)]
pub struct FuzzySearchEngine {
    threshold: f64,
}

impl FuzzySearchEngine {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return at most `limit` records with their scores, best first
    ///
    /// Ties keep input order, so a newest-first collection stays newest-first
    /// among equally good matches.
    pub fn search<T: Searchable>(&self, records: Vec<T>, query: &str, limit: usize) -> Vec<(T, f64)> {
        let terms = parse_terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits: Vec<(T, f64)> = records
            .into_iter()
            .filter_map(|record| {
                let score = score_record(&record, &terms, self.threshold)?;
                Some((record, score))
            })
            .collect();

        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }
}

fn parse_terms(query: &str) -> Vec<Vec<char>> {
    let terms: Vec<Vec<char>> = query
        .split('|')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .map(|term| term.chars().collect())
        .collect();

    if terms.iter().any(|t| t.len() >= MIN_TERM_CHARS) {
        terms.into_iter().filter(|t| t.len() >= MIN_TERM_CHARS).collect()
    } else {
        terms
    }
}

/// Mean term score for a record, or `None` when no term is within `threshold`
fn score_record<T: Searchable>(record: &T, terms: &[Vec<char>], threshold: f64) -> Option<f64> {
    let fields: Vec<Vec<char>> = record
        .search_fields()
        .into_iter()
        .map(|f| f.to_lowercase().chars().collect())
        .collect();

    let per_term: Vec<f64> = terms
        .iter()
        .map(|term| {
            fields
                .iter()
                .map(|field| pattern_score(term, field))
                .fold(1.0, f64::min)
        })
        .collect();

    if !per_term.iter().any(|&score| score <= threshold) {
        return None;
    }

    let total: f64 = per_term
        .iter()
        .map(|&score| if score <= threshold { score } else { 1.0 })
        .sum();
    Some(total / per_term.len() as f64)
}

/// Normalized edit distance between `pattern` and its best-matching substring of `text`
fn pattern_score(pattern: &[char], text: &[char]) -> f64 {
    if pattern.is_empty() {
        return 0.0;
    }
    (substring_distance(pattern, text) as f64 / pattern.len() as f64).min(1.0)
}

/// Sellers' algorithm: Levenshtein distance where the match may start and end
/// anywhere in `text`
fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    let m = pattern.len();
    let mut column: Vec<usize> = (0..=m).collect();
    let mut best = column[m];

    for &c in text {
        let mut diagonal = column[0];
        column[0] = 0;
        for i in 1..=m {
            let above = column[i];
            let cost = if pattern[i - 1] == c { 0 } else { 1 };
            column[i] = (diagonal + cost).min(above + 1).min(column[i - 1] + 1);
            diagonal = above;
        }
        best = best.min(column[m]);
    }

    best
}
