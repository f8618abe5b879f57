use anyhow::Result;
use clap::Parser;
use irlab_core::evaluation::{Grade, SweepPlan};
use irlab_core::scoring::ScoringAlgorithm;
use searcher::{run, SearchConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Run a query file against an index and evaluate the results", long_about = None)]
struct Args {
    /// Index file written by `indexer build`
    #[arg(long)]
    index: PathBuf,
    /// Queries, one per line; the line number is the query id
    #[arg(long)]
    queries: PathBuf,
    /// Output results file
    #[arg(long)]
    results: PathBuf,
    /// Relevance judgments: `<query> <doc> <grade>` per line
    #[arg(long)]
    judgments: PathBuf,
    /// Scoring algorithm: qwNumber, qwFrequency or cosineScore
    #[arg(long, default_value = "cosineScore")]
    algorithm: ScoringAlgorithm,
    /// Stopword list used when the index was built with ComplexTokenizer
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Keep documents scoring at least this value
    #[arg(long, num_args = 1..)]
    fixed_threshold: Vec<f64>,
    /// Keep documents scoring at least this fraction of the best score
    #[arg(long, num_args = 1..)]
    variable_threshold: Vec<f64>,
    /// Relevance levels: grades up to this value count as relevant
    #[arg(long, num_args = 1..)]
    relevance: Vec<Grade>,
    /// Print the measures of every query
    #[arg(long, default_value_t = false)]
    display_query_metrics: bool,
    /// Also write every sweep as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let plan = SweepPlan::new(&args.fixed_threshold, &args.variable_threshold, &args.relevance)?;
    let config = SearchConfig {
        index: args.index,
        queries: args.queries,
        results: args.results,
        judgments: args.judgments,
        algorithm: args.algorithm,
        stopwords: args.stopwords,
        plan,
        report_json: args.report_json,
    };

    let outcome = run(&config)?;
    for report in &outcome.reports {
        if args.display_query_metrics {
            print!("{}", report.query_table());
        }
        println!("{}", report);
    }
    Ok(())
}
