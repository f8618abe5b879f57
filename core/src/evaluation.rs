//! Retrieval quality measures against graded relevance judgments.
//!
//! Every `(relevance level, threshold)` sweep builds a fresh [`Evaluation`],
//! fills it with one [`QueryMetrics`] per query and reduces it into
//! [`SystemMetrics`]. Nothing is shared between sweeps except the read-only
//! [`RelevanceJudgments`].

use crate::error::{CoreError, Result};
use crate::index::DocId;
use crate::query::{Query, QueryId};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

/// Relevance grade; smaller is more relevant.
pub type Grade = i32;

/// Recall levels of the interpolated precision-recall curve.
pub const RECALL_LEVELS: [f64; 11] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Relevance level used when no sweep is requested.
pub const DEFAULT_RELEVANCE: Grade = 4;

/// Gain of a document of grade `g` is `DCG_BASE - g`.
const DCG_BASE: f64 = 5.0;

/// Cut-off rank of MAP@10.
const RANK_CUTOFF: usize = 10;

/// Ground truth: query id -> (document id -> grade).
#[derive(Debug, Clone, Default)]
pub struct RelevanceJudgments {
    judgments: BTreeMap<QueryId, HashMap<DocId, Grade>>,
}

impl RelevanceJudgments {
    /// Whitespace-separated `<query> <doc> <grade>` lines. Blank lines are ignored.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut judgments: BTreeMap<QueryId, HashMap<DocId, Grade>> = BTreeMap::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || CoreError::MalformedJudgment { line: n + 1, content: line.clone() };
            let mut fields = line.split_whitespace();
            let (Some(q), Some(d), Some(g)) = (fields.next(), fields.next(), fields.next()) else {
                return Err(malformed());
            };
            let query_id = q.parse::<QueryId>().map_err(|_| malformed())?;
            let doc_id = d.parse::<DocId>().map_err(|_| malformed())?;
            let grade = g.parse::<Grade>().map_err(|_| malformed())?;
            judgments.entry(query_id).or_default().insert(doc_id, grade);
        }
        Ok(Self { judgments })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
        let judgments = Self::read(BufReader::new(file)).map_err(|e| match e {
            CoreError::Stream(source) => CoreError::io(path, source),
            other => other,
        })?;
        tracing::info!(path = %path.display(), queries = judgments.num_queries(), "relevance judgments loaded");
        Ok(judgments)
    }

    pub fn insert(&mut self, query_id: QueryId, doc_id: DocId, grade: Grade) {
        self.judgments.entry(query_id).or_default().insert(doc_id, grade);
    }

    /// Documents judged for `query_id` with a grade of at most `n_ratings`.
    pub fn relevant(&self, query_id: QueryId, n_ratings: Grade) -> HashMap<DocId, Grade> {
        self.judgments
            .get(&query_id)
            .map(|docs| docs.iter().filter(|(_, &g)| g <= n_ratings).map(|(&d, &g)| (d, g)).collect())
            .unwrap_or_default()
    }

    pub fn num_queries(&self) -> usize {
        self.judgments.len()
    }
}

/// Which retrieved documents count for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Threshold {
    /// Keep scores `>= t`.
    Fixed(f64),
    /// Keep scores `>= max_score * t`.
    Variable(f64),
}

impl Threshold {
    pub fn cutoff(&self, query: &Query) -> f64 {
        match *self {
            Threshold::Fixed(t) => t,
            Threshold::Variable(fraction) => query.max_score().unwrap_or(0.0) * fraction,
        }
    }

    /// Surviving documents in rank order.
    pub fn apply(&self, query: &Query) -> Vec<DocId> {
        let cutoff = self.cutoff(query);
        query
            .ranked()
            .into_iter()
            .filter(|(_, score)| *score >= cutoff)
            .map(|(doc, _)| doc)
            .collect()
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Fixed(t) => write!(f, "fixed threshold {}", t),
            Threshold::Variable(t) => write!(f, "variable threshold {}", t),
        }
    }
}

/// Ordered list of `(relevance level, threshold)` evaluations to run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    sweeps: Vec<(Grade, Threshold)>,
}

impl SweepPlan {
    /// With no arguments at all: a single run at fixed threshold 0 and the
    /// default relevance level. Thresholds and relevance levels must otherwise
    /// be given together.
    pub fn new(fixed: &[f64], variable: &[f64], relevance: &[Grade]) -> Result<Self> {
        let has_threshold = !fixed.is_empty() || !variable.is_empty();
        match (has_threshold, relevance.is_empty()) {
            (false, true) => Ok(Self::default()),
            (false, false) => Err(CoreError::InvalidConfig(
                "relevance levels must be combined with a fixed and/or variable threshold".into(),
            )),
            (true, true) => Err(CoreError::InvalidConfig(
                "relevance levels are required when threshold values are given".into(),
            )),
            (true, false) => {
                let mut sweeps = Vec::new();
                for &r in relevance {
                    sweeps.extend(fixed.iter().map(|&t| (r, Threshold::Fixed(t))));
                    sweeps.extend(variable.iter().map(|&t| (r, Threshold::Variable(t))));
                }
                Ok(Self { sweeps })
            }
        }
    }

    pub fn sweeps(&self) -> &[(Grade, Threshold)] {
        &self.sweeps
    }
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self { sweeps: vec![(DEFAULT_RELEVANCE, Threshold::Fixed(0.0))] }
    }
}

/// Measures of a single query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryMetrics {
    pub query_id: QueryId,
    pub retrieved: usize,
    pub relevant: usize,
    pub true_positives: usize,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
    pub average_precision: f64,
    pub average_precision_at_10: f64,
    pub reciprocal_rank: f64,
    pub dcg: f64,
    pub latency_ms: f64,
    /// (recall, precision) at every relevant hit, in rank order.
    #[serde(skip)]
    pub recall_precision: Vec<(f64, f64)>,
    /// Interpolated precision at each of [`RECALL_LEVELS`].
    pub interpolated_precision: Vec<f64>,
}

impl QueryMetrics {
    pub fn compute(
        query_id: QueryId,
        retrieved: &[DocId],
        relevant: &HashMap<DocId, Grade>,
        latency: Duration,
    ) -> Self {
        let retrieved_set: HashSet<DocId> = retrieved.iter().copied().collect();
        let true_positives = relevant.keys().filter(|d| retrieved_set.contains(d)).count();

        let precision = precision(true_positives, retrieved.len());
        let recall = recall(true_positives, relevant.len());
        let (average_precision, recall_precision) = average_precision(retrieved, relevant);
        let (average_precision_at_10, _) = self::average_precision(&retrieved[..retrieved.len().min(RANK_CUTOFF)], relevant);
        let interpolated_precision = interpolate(&recall_precision);

        Self {
            query_id,
            retrieved: retrieved.len(),
            relevant: relevant.len(),
            true_positives,
            precision,
            recall,
            fmeasure: fmeasure(precision, recall),
            average_precision,
            average_precision_at_10,
            reciprocal_rank: reciprocal_rank(retrieved, relevant),
            dcg: dcg(retrieved, relevant),
            latency_ms: latency.as_secs_f64() * 1000.0,
            recall_precision,
            interpolated_precision,
        }
    }
}

pub fn precision(true_positives: usize, retrieved: usize) -> f64 {
    if retrieved == 0 {
        0.0
    } else {
        true_positives as f64 / retrieved as f64
    }
}

pub fn recall(true_positives: usize, relevant: usize) -> f64 {
    if relevant == 0 {
        0.0
    } else {
        true_positives as f64 / relevant as f64
    }
}

pub fn fmeasure(precision: f64, recall: f64) -> f64 {
    if precision == 0.0 && recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Mean of the precisions at each relevant hit, plus the (recall, precision)
/// point recorded at every hit. The scan stops once every relevant document
/// has been seen.
pub fn average_precision(retrieved: &[DocId], relevant: &HashMap<DocId, Grade>) -> (f64, Vec<(f64, f64)>) {
    let mut points = Vec::new();
    let mut sum = 0.0;
    let mut hits = 0usize;
    for (rank, doc) in retrieved.iter().enumerate() {
        if hits == relevant.len() {
            break;
        }
        if relevant.contains_key(doc) {
            hits += 1;
            let p = hits as f64 / (rank + 1) as f64;
            points.push((hits as f64 / relevant.len() as f64, p));
            sum += p;
        }
    }
    let ap = if hits == 0 { 0.0 } else { sum / hits as f64 };
    (ap, points)
}

/// `1 / rank` of the first relevant document, 0 when none was retrieved.
pub fn reciprocal_rank(retrieved: &[DocId], relevant: &HashMap<DocId, Grade>) -> f64 {
    retrieved
        .iter()
        .position(|d| relevant.contains_key(d))
        .map_or(0.0, |rank| 1.0 / (rank + 1) as f64)
}

/// Graded DCG: gain `5 - grade`, undiscounted at the first rank and divided by
/// `log2(i + 1)` at 0-based rank `i >= 1`.
pub fn dcg(retrieved: &[DocId], relevant: &HashMap<DocId, Grade>) -> f64 {
    retrieved
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| relevant.get(doc).map(|&g| (i, DCG_BASE - g as f64)))
        .map(|(i, gain)| if i == 0 { gain } else { gain / ((i + 1) as f64).log2() })
        .sum()
}

/// Maximum precision at recall `>= level` for every level in [`RECALL_LEVELS`].
pub fn interpolate(points: &[(f64, f64)]) -> Vec<f64> {
    RECALL_LEVELS
        .iter()
        .map(|&level| {
            points
                .iter()
                .filter(|(r, _)| *r >= level)
                .map(|(_, p)| *p)
                .fold(0.0, f64::max)
        })
        .collect()
}

/// Median of the latencies; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// System-wide measures of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub num_queries: usize,
    pub true_positives: usize,
    pub retrieved: usize,
    pub relevant: usize,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
    pub map: f64,
    pub map_at_10: f64,
    pub mrr: f64,
    pub median_latency_ms: f64,
    /// Queries per second over the summed query latencies.
    pub throughput: f64,
    /// Interpolated precision averaged over queries, one value per recall level.
    pub interpolated_precision: Vec<f64>,
}

/// Accumulator of one sweep.
#[derive(Debug)]
pub struct Evaluation<'j> {
    judgments: &'j RelevanceJudgments,
    n_ratings: Grade,
    queries: Vec<QueryMetrics>,
}

impl<'j> Evaluation<'j> {
    pub fn new(judgments: &'j RelevanceJudgments, n_ratings: Grade) -> Self {
        Self { judgments, n_ratings, queries: Vec::new() }
    }

    /// Measure one query given its retrieved documents in rank order.
    pub fn add_query(&mut self, query_id: QueryId, retrieved: &[DocId], latency: Duration) -> &QueryMetrics {
        let relevant = self.judgments.relevant(query_id, self.n_ratings);
        let metrics = QueryMetrics::compute(query_id, retrieved, &relevant, latency);
        self.queries.push(metrics);
        &self.queries[self.queries.len() - 1]
    }

    /// Measure every query in parallel, keeping query order.
    pub fn add_queries(&mut self, queries: &[Query], threshold: Threshold) {
        let judgments = self.judgments;
        let n_ratings = self.n_ratings;
        let metrics: Vec<QueryMetrics> = queries
            .par_iter()
            .map(|q| {
                let relevant = judgments.relevant(q.id, n_ratings);
                QueryMetrics::compute(q.id, &threshold.apply(q), &relevant, q.latency)
            })
            .collect();
        self.queries.extend(metrics);
    }

    pub fn queries(&self) -> &[QueryMetrics] {
        &self.queries
    }

    pub fn summarize(&self) -> SystemMetrics {
        let n = self.queries.len();
        let true_positives: usize = self.queries.iter().map(|q| q.true_positives).sum();
        let retrieved: usize = self.queries.iter().map(|q| q.retrieved).sum();
        let relevant: usize = self.queries.iter().map(|q| q.relevant).sum();
        let precision = precision(true_positives, retrieved);
        let recall = recall(true_positives, relevant);

        let mean = |f: fn(&QueryMetrics) -> f64| {
            if n == 0 {
                0.0
            } else {
                self.queries.iter().map(f).sum::<f64>() / n as f64
            }
        };

        let latencies: Vec<f64> = self.queries.iter().map(|q| q.latency_ms).collect();
        let total_secs = latencies.iter().sum::<f64>() / 1000.0;
        let throughput = if total_secs > 0.0 { n as f64 / total_secs } else { 0.0 };

        let mut curve = vec![0.0; RECALL_LEVELS.len()];
        if n > 0 {
            for q in &self.queries {
                for (acc, p) in curve.iter_mut().zip(&q.interpolated_precision) {
                    *acc += p;
                }
            }
            for acc in curve.iter_mut() {
                *acc /= n as f64;
            }
        }

        SystemMetrics {
            num_queries: n,
            true_positives,
            retrieved,
            relevant,
            precision,
            recall,
            fmeasure: fmeasure(precision, recall),
            map: mean(|q| q.average_precision),
            map_at_10: mean(|q| q.average_precision_at_10),
            // queries without a relevant hit contribute 0 but still count
            mrr: mean(|q| q.reciprocal_rank),
            median_latency_ms: median(&latencies),
            throughput,
            interpolated_precision: curve,
        }
    }

    pub fn into_report(self, threshold: Threshold) -> EvaluationReport {
        let system = self.summarize();
        EvaluationReport { relevance: self.n_ratings, threshold, system, queries: self.queries }
    }
}

/// Evaluate retrieved queries for one `(relevance level, threshold)` sweep.
pub fn evaluate(judgments: &RelevanceJudgments, queries: &[Query], n_ratings: Grade, threshold: Threshold) -> EvaluationReport {
    let mut evaluation = Evaluation::new(judgments, n_ratings);
    evaluation.add_queries(queries, threshold);
    evaluation.into_report(threshold)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub relevance: Grade,
    pub threshold: Threshold,
    pub system: SystemMetrics,
    pub queries: Vec<QueryMetrics>,
}

impl EvaluationReport {
    pub fn query_table(&self) -> String {
        let mut out = format!(
            "{:<9}| {:<13}| {:<10}| {:<8}| {:<10}| {:<14}| {:<22}| {:<16}| {}\n",
            "Query Id",
            "Latency (ms)",
            "Precision",
            "Recall",
            "F-measure",
            "Av. precision",
            "Av. precision rank 10",
            "Reciprocal rank",
            "DCG"
        );
        for q in &self.queries {
            out.push_str(&format!(
                "{:<9}| {:<13.4}| {:<10.5}| {:<8.5}| {:<10.5}| {:<14.5}| {:<22.5}| {:<16.5}| {:.5}\n",
                q.query_id,
                q.latency_ms,
                q.precision,
                q.recall,
                q.fmeasure,
                q.average_precision,
                q.average_precision_at_10,
                q.reciprocal_rank,
                q.dcg
            ));
        }
        out
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.system;
        writeln!(f, "== relevance <= {}, {} ==", self.relevance, self.threshold)?;
        writeln!(f, "True positives: {}", s.true_positives)?;
        writeln!(f, "Retrieved docs: {}", s.retrieved)?;
        writeln!(f, "Relevant docs: {}", s.relevant)?;
        writeln!(f, "Precision: {:.5}", s.precision)?;
        writeln!(f, "Recall: {:.5}", s.recall)?;
        writeln!(f, "F-measure: {:.5}", s.fmeasure)?;
        writeln!(f, "Mean Average Precision: {:.5}", s.map)?;
        writeln!(f, "Mean Average Precision at Rank 10: {:.5}", s.map_at_10)?;
        writeln!(f, "Mean Reciprocal Rank: {:.5}", s.mrr)?;
        writeln!(f, "Query throughput (queries/s): {:.2}", s.throughput)?;
        writeln!(f, "Median query latency (ms): {:.4}", s.median_latency_ms)?;
        write!(f, "Interpolated precision:")?;
        for (level, p) in RECALL_LEVELS.iter().zip(&s.interpolated_precision) {
            write!(f, " {:.1}={:.4}", level, p)?;
        }
        writeln!(f)
    }
}
