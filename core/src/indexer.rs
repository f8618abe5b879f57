use crate::codec;
use crate::corpus::Document;
use crate::error::Result;
use crate::index::{DocId, InvertedIndex, Posting, WeightScheme};
use crate::tokenizer::{Tokenizer, TokenizerKind};
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

/// Accumulates documents into an [`InvertedIndex`].
///
/// `index` is called once per document with all of its terms; calling it
/// twice for the same id is not supported.
pub trait Indexer: Send {
    fn index(&mut self, terms: &[String], doc_id: DocId);

    fn inverted_index(&self) -> &InvertedIndex;

    fn into_inverted_index(self: Box<Self>) -> InvertedIndex;

    /// Write the index in the line-oriented text format.
    fn save(&self, writer: &mut dyn Write) -> Result<()> {
        codec::write_index(writer, self.inverted_index())
    }
}

pub fn new_indexer(scheme: WeightScheme, tokenizer: TokenizerKind) -> Box<dyn Indexer> {
    match scheme {
        WeightScheme::Frequency => Box::new(TermFreqIndexer::new(tokenizer)),
        WeightScheme::Weighted => Box::new(WeightedIndexer::new(tokenizer)),
    }
}

/// Raw term-frequency postings.
#[derive(Debug)]
pub struct TermFreqIndexer {
    index: InvertedIndex,
}

impl TermFreqIndexer {
    pub fn new(tokenizer: TokenizerKind) -> Self {
        Self { index: InvertedIndex::new(tokenizer, WeightScheme::Frequency) }
    }

    pub fn into_index(self) -> InvertedIndex {
        self.index
    }
}

impl Indexer for TermFreqIndexer {
    fn index(&mut self, terms: &[String], doc_id: DocId) {
        for term in terms {
            let list = self.index.postings_mut(term);
            // a document's terms arrive in one call, so only the tail can belong to it
            match list.last_mut() {
                Some(last) if last.doc_id == doc_id => last.weight += 1.0,
                _ => list.push(Posting::new(doc_id, 1.0)),
            }
        }
        self.index.add_document();
    }

    fn inverted_index(&self) -> &InvertedIndex {
        &self.index
    }

    fn into_inverted_index(self: Box<Self>) -> InvertedIndex {
        self.index
    }
}

/// lnc postings: `1 + log10(tf)`, L2-normalized per document.
#[derive(Debug)]
pub struct WeightedIndexer {
    index: InvertedIndex,
}

impl WeightedIndexer {
    pub fn new(tokenizer: TokenizerKind) -> Self {
        Self { index: InvertedIndex::new(tokenizer, WeightScheme::Weighted) }
    }

    /// Append one document whose weights were computed with [`document_weights`].
    pub fn append_weights(&mut self, doc_id: DocId, weights: Vec<(String, f64)>) {
        for (term, weight) in weights {
            self.index.postings_mut(&term).push(Posting::new(doc_id, weight));
        }
        self.index.add_document();
    }

    pub fn into_index(self) -> InvertedIndex {
        self.index
    }
}

impl Indexer for WeightedIndexer {
    fn index(&mut self, terms: &[String], doc_id: DocId) {
        let weights = document_weights(terms);
        self.append_weights(doc_id, weights);
    }

    fn inverted_index(&self) -> &InvertedIndex {
        &self.index
    }

    fn into_inverted_index(self: Box<Self>) -> InvertedIndex {
        self.index
    }
}

/// Normalized log-tf weight of every distinct term of one document, sorted by term.
///
/// Depends only on the document's own terms, so documents can be weighted
/// independently of each other.
pub fn document_weights(terms: &[String]) -> Vec<(String, f64)> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for term in terms {
        *counts.entry(term.as_str()).or_insert(0) += 1;
    }

    let mut weights: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(term, count)| (term.to_string(), 1.0 + (count as f64).log10()))
        .collect();

    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in weights.iter_mut() {
            *w /= norm;
        }
    }
    weights.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    weights
}

/// Index `documents` in slice order.
///
/// Tokenization and per-document weighting run on the rayon pool; postings
/// are appended sequentially, so the result matches a one-by-one build.
pub fn build_index(documents: &[Document], scheme: WeightScheme, tokenizer: &dyn Tokenizer) -> InvertedIndex {
    let tokenized: Vec<(DocId, Vec<String>)> = documents
        .par_iter()
        .map(|doc| (doc.id, tokenizer.tokenize(&doc.text)))
        .collect();

    let index = match scheme {
        WeightScheme::Frequency => {
            let mut indexer = TermFreqIndexer::new(tokenizer.kind());
            for (doc_id, terms) in &tokenized {
                indexer.index(terms, *doc_id);
            }
            indexer.into_index()
        }
        WeightScheme::Weighted => {
            let weighted: Vec<(DocId, Vec<(String, f64)>)> = tokenized
                .into_par_iter()
                .map(|(doc_id, terms)| (doc_id, document_weights(&terms)))
                .collect();
            let mut indexer = WeightedIndexer::new(tokenizer.kind());
            for (doc_id, weights) in weighted {
                indexer.append_weights(doc_id, weights);
            }
            indexer.into_index()
        }
    };
    tracing::info!(num_docs = index.num_docs(), num_terms = index.len(), scheme = %scheme, "index built");
    index
}
