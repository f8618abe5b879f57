use anyhow::{Context, Result};
use irlab_core::codec::load_index;
use irlab_core::evaluation::{evaluate, EvaluationReport, RelevanceJudgments, SweepPlan};
use irlab_core::retrieval::{build_retrieval, load_queries, retrieve_all, save_results};
use irlab_core::scoring::ScoringAlgorithm;
use irlab_core::tokenizer::Tokenizer;
use irlab_core::{InvertedIndex, Query, QueryId};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything one searcher run needs.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub index: PathBuf,
    pub queries: PathBuf,
    pub results: PathBuf,
    pub judgments: PathBuf,
    pub algorithm: ScoringAlgorithm,
    pub stopwords: Option<PathBuf>,
    pub plan: SweepPlan,
    pub report_json: Option<PathBuf>,
}

/// A loaded index together with the tokenizer it was built with.
pub struct Searcher {
    index: InvertedIndex,
    tokenizer: Box<dyn Tokenizer>,
    algorithm: ScoringAlgorithm,
}

impl Searcher {
    /// Load the index in the weighting `algorithm` reads and rebuild the
    /// tokenizer named in its header.
    pub fn open(index: &Path, algorithm: ScoringAlgorithm, stopwords: Option<&Path>) -> Result<Self> {
        let index = load_index(index, algorithm.scheme())
            .with_context(|| format!("loading {} index {}", algorithm.scheme(), index.display()))?;
        let tokenizer = index
            .tokenizer()
            .build(stopwords)
            .with_context(|| format!("building {}", index.tokenizer()))?;
        Ok(Self { index, tokenizer, algorithm })
    }

    pub fn search(&self, queries: &[(QueryId, String)]) -> Vec<Query> {
        let retrieval = build_retrieval(self.algorithm, &self.index, self.tokenizer.as_ref());
        let started = Instant::now();
        let results = retrieve_all(retrieval.as_ref(), queries);
        tracing::info!(
            algorithm = %self.algorithm,
            queries = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "queries executed"
        );
        results
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub queries: Vec<Query>,
    pub reports: Vec<EvaluationReport>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    algorithm: &'a str,
    sweeps: &'a [EvaluationReport],
}

/// Retrieve every query, write the results file and evaluate each sweep of
/// the plan with a fresh accumulator.
pub fn run(config: &SearchConfig) -> Result<SearchOutcome> {
    let searcher = Searcher::open(&config.index, config.algorithm, config.stopwords.as_deref())?;
    let queries = load_queries(&config.queries)
        .with_context(|| format!("reading queries {}", config.queries.display()))?;
    let judgments = RelevanceJudgments::load(&config.judgments)
        .with_context(|| format!("reading relevance judgments {}", config.judgments.display()))?;

    let results = searcher.search(&queries);
    save_results(&config.results, &results, config.algorithm.is_integral())
        .with_context(|| format!("writing results {}", config.results.display()))?;
    tracing::info!(path = %config.results.display(), "results written");

    let reports: Vec<EvaluationReport> = config
        .plan
        .sweeps()
        .iter()
        .map(|&(relevance, threshold)| {
            let report = evaluate(&judgments, &results, relevance, threshold);
            tracing::debug!(relevance, %threshold, map = report.system.map, "sweep evaluated");
            report
        })
        .collect();

    if let Some(path) = &config.report_json {
        write_json_report(path, config.algorithm, &reports)?;
    }
    Ok(SearchOutcome { queries: results, reports })
}

fn write_json_report(path: &Path, algorithm: ScoringAlgorithm, reports: &[EvaluationReport]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating report {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &JsonReport { algorithm: algorithm.as_str(), sweeps: reports })?;
    writer.flush()?;
    tracing::info!(path = %path.display(), sweeps = reports.len(), "json report written");
    Ok(())
}
