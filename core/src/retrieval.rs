use crate::error::{CoreError, Result};
use crate::index::{InvertedIndex, Posting};
use crate::query::{Query, QueryId};
use crate::scoring::{CosineScore, ScoringAlgorithm, ScoringStrategy};
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Answers one query against a read-only index.
pub trait Retrieval: Send + Sync {
    /// Score every candidate document. The returned query carries the
    /// wall-clock latency of the call.
    fn retrieve(&self, query_id: QueryId, text: &str) -> Query;
}

/// OR of all query terms, scored by a per-posting strategy.
pub struct DisjunctiveRetrieval<'a> {
    index: &'a InvertedIndex,
    tokenizer: &'a dyn Tokenizer,
    scoring: Box<dyn ScoringStrategy>,
}

impl<'a> DisjunctiveRetrieval<'a> {
    pub fn new(index: &'a InvertedIndex, tokenizer: &'a dyn Tokenizer, scoring: Box<dyn ScoringStrategy>) -> Self {
        Self { index, tokenizer, scoring }
    }
}

impl Retrieval for DisjunctiveRetrieval<'_> {
    fn retrieve(&self, query_id: QueryId, text: &str) -> Query {
        let start = Instant::now();
        let terms = self.tokenizer.tokenize(text);

        let mut postings: Vec<Posting> = Vec::new();
        for term in &terms {
            if let Some(list) = self.index.postings(term) {
                postings.extend_from_slice(list);
            }
        }

        let mut query = Query::new(query_id);
        self.scoring.compute_scores(&mut query, &postings);
        query.latency = start.elapsed();
        tracing::debug!(query_id, terms = terms.len(), candidates = query.len(), "disjunctive retrieval");
        query
    }
}

/// Vector-space model with cosine scoring.
pub struct RankedRetrieval<'a> {
    tokenizer: &'a dyn Tokenizer,
    cosine: CosineScore<'a>,
}

impl<'a> RankedRetrieval<'a> {
    pub fn new(index: &'a InvertedIndex, tokenizer: &'a dyn Tokenizer) -> Self {
        Self { tokenizer, cosine: CosineScore::new(index) }
    }
}

impl Retrieval for RankedRetrieval<'_> {
    fn retrieve(&self, query_id: QueryId, text: &str) -> Query {
        let start = Instant::now();
        let terms = self.tokenizer.tokenize(text);
        let mut query = Query::new(query_id);
        self.cosine.compute_scores(&mut query, &terms);
        query.latency = start.elapsed();
        tracing::debug!(query_id, terms = terms.len(), candidates = query.len(), "ranked retrieval");
        query
    }
}

/// Retrieval model matching `algorithm`. The index must use `algorithm.scheme()`.
pub fn build_retrieval<'a>(
    algorithm: ScoringAlgorithm,
    index: &'a InvertedIndex,
    tokenizer: &'a dyn Tokenizer,
) -> Box<dyn Retrieval + 'a> {
    match algorithm.strategy() {
        Some(strategy) => Box::new(DisjunctiveRetrieval::new(index, tokenizer, strategy)),
        None => Box::new(RankedRetrieval::new(index, tokenizer)),
    }
}

/// Run independent queries in parallel. Results are ordered by query id.
pub fn retrieve_all(retrieval: &dyn Retrieval, queries: &[(QueryId, String)]) -> Vec<Query> {
    let mut results: Vec<Query> = queries
        .par_iter()
        .map(|(id, text)| retrieval.retrieve(*id, text))
        .collect();
    results.sort_by_key(|q| q.id);
    results
}

/// One query per line; the 1-based line number is the query id.
pub fn read_queries<R: BufRead>(reader: R) -> Result<Vec<(QueryId, String)>> {
    let mut queries = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        queries.push((n as QueryId + 1, line?));
    }
    Ok(queries)
}

pub fn load_queries(path: &Path) -> Result<Vec<(QueryId, String)>> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    read_queries(BufReader::new(file)).map_err(|e| match e {
        CoreError::Stream(source) => CoreError::io(path, source),
        other => other,
    })
}

/// `<query>\t<doc>\t<score>` lines; queries ascending, documents by descending
/// score then ascending id.
pub fn write_results<W: Write>(mut writer: W, queries: &[Query], integral: bool) -> Result<()> {
    let mut ordered: Vec<&Query> = queries.iter().collect();
    ordered.sort_by_key(|q| q.id);
    for query in ordered {
        for (doc_id, score) in query.ranked() {
            if integral {
                writeln!(writer, "{}\t{}\t{}", query.id, doc_id, score.round() as i64)?;
            } else {
                writeln!(writer, "{}\t{}\t{:.6}", query.id, doc_id, score)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn save_results(path: &Path, queries: &[Query], integral: bool) -> Result<()> {
    let file = File::create(path).map_err(|e| CoreError::io(path, e))?;
    write_results(BufWriter::new(file), queries, integral).map_err(|e| match e {
        CoreError::Stream(source) => CoreError::io(path, source),
        other => other,
    })
}
