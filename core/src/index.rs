use crate::error::CoreError;
use crate::tokenizer::TokenizerKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type DocId = u32;

/// One occurrence record of a term in a document.
///
/// The meaning of `weight` depends on the [`WeightScheme`] of the index that
/// owns the posting: a raw term frequency for [`WeightScheme::Frequency`], or
/// the L2-normalized `1 + log10(tf)` weight for [`WeightScheme::Weighted`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64,
}

impl Posting {
    pub fn new(doc_id: DocId, weight: f64) -> Self {
        Self { doc_id, weight }
    }

    /// Term frequency view of the payload. Only meaningful for frequency indexes.
    pub fn term_freq(&self) -> u32 {
        self.weight as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightScheme {
    /// Raw term frequency per (term, document).
    Frequency,
    /// Log-scaled term frequency, L2-normalized per document (lnc).
    Weighted,
}

impl WeightScheme {
    pub const EXPECTED: &'static str = "freq, weighted";

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightScheme::Frequency => "freq",
            WeightScheme::Weighted => "weighted",
        }
    }

    /// Text form of a posting weight in the on-disk index.
    pub fn format_weight(&self, weight: f64) -> String {
        match self {
            WeightScheme::Frequency => format!("{}", weight.round() as u64),
            WeightScheme::Weighted => format!("{:.5}", weight),
        }
    }
}

impl fmt::Display for WeightScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightScheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "freq" | "frequency" => Ok(WeightScheme::Frequency),
            "weighted" => Ok(WeightScheme::Weighted),
            other => Err(CoreError::UnknownSelector {
                kind: "weighting scheme",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Term -> posting list map plus the metadata needed to query it again.
///
/// Posting lists are never empty. Within a list there is at most one posting
/// per document; lists are kept in insertion order and sorted by `doc_id`
/// when serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    num_docs: u32,
    tokenizer: TokenizerKind,
    scheme: WeightScheme,
}

impl InvertedIndex {
    pub fn new(tokenizer: TokenizerKind, scheme: WeightScheme) -> Self {
        Self { postings: HashMap::new(), num_docs: 0, tokenizer, scheme }
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn tokenizer(&self) -> TokenizerKind {
        self.tokenizer
    }

    pub fn scheme(&self) -> WeightScheme {
        self.scheme
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn sorted_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.postings.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }

    /// First `limit` terms, in lexicographic order, that occur in exactly one document.
    pub fn terms_in_one_doc(&self, limit: usize) -> Vec<&str> {
        self.sorted_terms()
            .into_iter()
            .filter(|t| self.doc_freq(t) == 1)
            .take(limit)
            .collect()
    }

    /// The `limit` terms with the highest document frequency; ties are broken lexicographically.
    pub fn terms_by_doc_freq(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut terms: Vec<(&str, usize)> = self.iter().map(|(t, p)| (t, p.len())).collect();
        terms.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(limit);
        terms
    }

    pub(crate) fn postings_mut(&mut self, term: &str) -> &mut Vec<Posting> {
        self.postings.entry(term.to_string()).or_default()
    }

    /// Replace the posting list of `term`. Empty lists are dropped.
    pub(crate) fn insert_postings(&mut self, term: String, postings: Vec<Posting>) {
        if postings.is_empty() {
            self.postings.remove(&term);
        } else {
            self.postings.insert(term, postings);
        }
    }

    pub(crate) fn add_document(&mut self) {
        self.num_docs += 1;
    }

    pub(crate) fn set_num_docs(&mut self, num_docs: u32) {
        self.num_docs = num_docs;
    }
}
