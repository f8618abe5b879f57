use crate::error::CoreError;
use crate::index::{DocId, InvertedIndex, Posting, WeightScheme};
use crate::query::{DocumentVector, Query};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Accumulates document scores from a flat list of postings.
pub trait ScoringStrategy: Send + Sync {
    fn compute_scores(&self, query: &mut Query, postings: &[Posting]);
}

/// +1 per posting: how many query terms a document matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl ScoringStrategy for WordCount {
    fn compute_scores(&self, query: &mut Query, postings: &[Posting]) {
        for p in postings {
            query.increase(p.doc_id, 1.0);
        }
    }
}

/// Sum of stored term frequencies. Expects a frequency index.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordFrequency;

impl ScoringStrategy for WordFrequency {
    fn compute_scores(&self, query: &mut Query, postings: &[Posting]) {
        for p in postings {
            query.increase(p.doc_id, p.term_freq() as f64);
        }
    }
}

/// Cosine similarity between an ltc query vector and lnc document vectors.
pub struct CosineScore<'a> {
    index: &'a InvertedIndex,
}

impl<'a> CosineScore<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    pub fn compute_scores(&self, query: &mut Query, terms: &[String]) {
        let query_weights = self.query_weights(terms);
        let vectors = self.document_vectors(terms);

        for vector in vectors.values() {
            for (term, qw) in query_weights.iter() {
                if *qw == 0.0 {
                    continue;
                }
                let product = qw * vector.term_weight(term);
                if product != 0.0 {
                    query.increase(vector.doc_id, product);
                }
            }
        }
    }

    /// `(1 + log10 tf) * log10(N / df)` per distinct term, L2-normalized.
    /// Terms missing from the index weigh 0.
    pub fn query_weights(&self, terms: &[String]) -> HashMap<String, f64> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for term in terms {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }

        let num_docs = self.index.num_docs() as f64;
        let mut weights: HashMap<String, f64> = HashMap::with_capacity(counts.len());
        for (term, count) in counts {
            let df = self.index.doc_freq(term);
            let weight = if df == 0 {
                0.0
            } else {
                let tf = 1.0 + (count as f64).log10();
                let idf = (num_docs / df as f64).log10();
                tf * idf
            };
            weights.insert(term.to_string(), weight);
        }

        let sum_sq: f64 = weights.values().map(|w| w * w).sum();
        if sum_sq != 0.0 {
            let norm = sum_sq.sqrt();
            for w in weights.values_mut() {
                *w /= norm;
            }
        }
        weights
    }

    /// One vector per document sharing at least one term with the query.
    pub fn document_vectors(&self, terms: &[String]) -> HashMap<DocId, DocumentVector> {
        let mut vectors: HashMap<DocId, DocumentVector> = HashMap::new();
        for term in terms {
            let Some(postings) = self.index.postings(term) else { continue };
            for p in postings {
                vectors
                    .entry(p.doc_id)
                    .or_insert_with(|| DocumentVector::new(p.doc_id))
                    .add_term(term, p.weight);
            }
        }
        vectors
    }
}

/// Scoring selector as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringAlgorithm {
    /// `qwNumber`
    WordCount,
    /// `qwFrequency`
    WordFrequency,
    /// `cosineScore`
    Cosine,
}

impl ScoringAlgorithm {
    pub const EXPECTED: &'static str = "qwNumber, qwFrequency, cosineScore";

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringAlgorithm::WordCount => "qwNumber",
            ScoringAlgorithm::WordFrequency => "qwFrequency",
            ScoringAlgorithm::Cosine => "cosineScore",
        }
    }

    /// Index weighting the algorithm reads.
    pub fn scheme(&self) -> WeightScheme {
        match self {
            ScoringAlgorithm::WordCount | ScoringAlgorithm::WordFrequency => WeightScheme::Frequency,
            ScoringAlgorithm::Cosine => WeightScheme::Weighted,
        }
    }

    /// Per-posting strategy for the boolean model; `None` for the vector-space model.
    pub fn strategy(&self) -> Option<Box<dyn ScoringStrategy>> {
        match self {
            ScoringAlgorithm::WordCount => Some(Box::new(WordCount)),
            ScoringAlgorithm::WordFrequency => Some(Box::new(WordFrequency)),
            ScoringAlgorithm::Cosine => None,
        }
    }

    /// Whether scores are always whole numbers.
    pub fn is_integral(&self) -> bool {
        !matches!(self, ScoringAlgorithm::Cosine)
    }
}

impl fmt::Display for ScoringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qwNumber" => Ok(ScoringAlgorithm::WordCount),
            "qwFrequency" => Ok(ScoringAlgorithm::WordFrequency),
            "cosineScore" => Ok(ScoringAlgorithm::Cosine),
            other => Err(CoreError::UnknownSelector {
                kind: "scoring algorithm",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{Indexer, WeightedIndexer};
    use crate::tokenizer::TokenizerKind;

    fn terms(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn postings() -> Vec<Posting> {
        vec![Posting::new(1, 3.0), Posting::new(2, 1.0), Posting::new(1, 2.0)]
    }

    #[test]
    fn word_count_adds_one_per_posting() {
        let mut q = Query::new(1);
        WordCount.compute_scores(&mut q, &postings());
        assert_eq!(q.score(1), Some(2.0));
        assert_eq!(q.score(2), Some(1.0));
    }

    #[test]
    fn word_frequency_adds_term_frequencies() {
        let mut q = Query::new(1);
        WordFrequency.compute_scores(&mut q, &postings());
        assert_eq!(q.score(1), Some(5.0));
        assert_eq!(q.score(2), Some(1.0));
    }

    fn weighted_index() -> InvertedIndex {
        let mut ix = WeightedIndexer::new(TokenizerKind::Simple);
        ix.index(&terms("shock wave shock"), 1);
        ix.index(&terms("wave drag"), 2);
        ix.index(&terms("boundary layer"), 3);
        ix.into_index()
    }

    #[test]
    fn query_weights_are_normalized_and_ignore_unknown_terms() {
        let idx = weighted_index();
        let cosine = CosineScore::new(&idx);
        let w = cosine.query_weights(&terms("shock wave nozzle"));
        assert_eq!(w["nozzle"], 0.0);
        let sum: f64 = w.values().map(|x| x * x).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // shock is rarer than wave so it weighs more
        assert!(w["shock"] > w["wave"]);
    }

    #[test]
    fn unknown_only_query_scores_nothing() {
        let idx = weighted_index();
        let mut q = Query::new(1);
        CosineScore::new(&idx).compute_scores(&mut q, &terms("nozzle"));
        assert!(q.is_empty());
    }

    #[test]
    fn cosine_ranks_best_match_first() {
        let idx = weighted_index();
        let mut q = Query::new(1);
        CosineScore::new(&idx).compute_scores(&mut q, &terms("shock"));
        assert_eq!(q.ranked().first().map(|r| r.0), Some(1));
        assert!(q.score(3).is_none());
    }

    #[test]
    fn selector_maps_to_index_scheme() {
        assert_eq!("qwFrequency".parse::<ScoringAlgorithm>().unwrap().scheme(), WeightScheme::Frequency);
        assert_eq!("cosineScore".parse::<ScoringAlgorithm>().unwrap().scheme(), WeightScheme::Weighted);
        assert!(ScoringAlgorithm::Cosine.strategy().is_none());
        assert!("bm25".parse::<ScoringAlgorithm>().is_err());
    }
}
