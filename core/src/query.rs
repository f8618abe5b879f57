use crate::index::DocId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

pub type QueryId = u32;

/// Scores accumulated for one query execution.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub id: QueryId,
    scores: HashMap<DocId, f64>,
    /// Wall-clock duration of the retrieval that produced the scores.
    pub latency: Duration,
}

impl Query {
    pub fn new(id: QueryId) -> Self {
        Self { id, scores: HashMap::new(), latency: Duration::ZERO }
    }

    pub fn increase(&mut self, doc_id: DocId, delta: f64) {
        *self.scores.entry(doc_id).or_insert(0.0) += delta;
    }

    pub fn score(&self, doc_id: DocId) -> Option<f64> {
        self.scores.get(&doc_id).copied()
    }

    pub fn scores(&self) -> &HashMap<DocId, f64> {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn max_score(&self) -> Option<f64> {
        self.scores.values().copied().reduce(f64::max)
    }

    /// Documents by descending score, ascending id on ties.
    pub fn ranked(&self) -> Vec<(DocId, f64)> {
        let mut ranked: Vec<(DocId, f64)> = self.scores.iter().map(|(&d, &s)| (d, s)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// Per-document term weights gathered from the postings of one query's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVector {
    pub doc_id: DocId,
    weights: HashMap<String, f64>,
}

impl DocumentVector {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, weights: HashMap::new() }
    }

    pub fn add_term(&mut self, term: &str, weight: f64) {
        self.weights.insert(term.to_string(), weight);
    }

    /// Zero for terms the document does not contain.
    pub fn term_weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }
}
