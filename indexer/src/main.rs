use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use irlab_core::codec::{detect_scheme_of, load_index, save_index};
use irlab_core::corpus::{CorpusFormat, Document};
use irlab_core::indexer::build_index;
use irlab_core::tokenizer::TokenizerKind;
use irlab_core::{InvertedIndex, WeightScheme};
use rayon::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};
use std::time::Instant;

/// Number of terms listed by the index statistics.
const STATS_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect inverted indexes of a document collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a corpus directory (or a single document file)
    Build {
        /// Corpus path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index file
        #[arg(long)]
        output: PathBuf,
        /// Weighting scheme: freq or weighted
        #[arg(long, default_value = "freq")]
        scheme: WeightScheme,
        /// Tokenizer: ComplexTokenizer or SimpleTokenizer
        #[arg(long, default_value = "ComplexTokenizer")]
        tokenizer: TokenizerKind,
        /// Stopword list, one word per line (ComplexTokenizer only)
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Corpus file format: cranfield or json
        #[arg(long, default_value = "cranfield")]
        format: CorpusFormat,
    },
    /// Print statistics of an existing index
    Stats {
        /// Index file
        #[arg(long)]
        index: PathBuf,
        /// Weighting scheme the index was built with; detected from the file when omitted
        #[arg(long)]
        scheme: Option<WeightScheme>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, scheme, tokenizer, stopwords, format } => {
            build(&input, &output, scheme, tokenizer, stopwords.as_deref(), format)
        }
        Commands::Stats { index, scheme } => {
            let scheme = match scheme {
                Some(scheme) => scheme,
                None => detect_scheme_of(&index).with_context(|| format!("reading index {}", index.display()))?,
            };
            tracing::debug!(%scheme, "reading index statistics");
            let index = load_index(&index, scheme).with_context(|| format!("loading index {}", index.display()))?;
            print_stats(&index);
            Ok(())
        }
    }
}

fn build(
    input: &Path,
    output: &Path,
    scheme: WeightScheme,
    tokenizer: TokenizerKind,
    stopwords: Option<&Path>,
    format: CorpusFormat,
) -> Result<()> {
    let started = Instant::now();
    let tokenizer = tokenizer.build(stopwords).context("building tokenizer")?;
    let files = corpus_files(input)?;
    tracing::info!(input = %input.display(), files = files.len(), %format, "reading corpus");

    let reader = format.reader();
    // par_iter keeps file order in the collected vector
    let documents: Vec<Document> = files.par_iter().filter_map(|path| reader.read(path)).collect();
    if documents.len() < files.len() {
        tracing::warn!(skipped = files.len() - documents.len(), "some corpus files were not indexed");
    }

    let index = build_index(&documents, scheme, tokenizer.as_ref());
    save_index(output, &index).with_context(|| format!("writing index {}", output.display()))?;

    tracing::info!(
        output = %output.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index build complete"
    );
    print_stats(&index);
    Ok(())
}

/// Regular files under `input`, in sorted path order.
fn corpus_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("corpus path {} does not exist", input.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", input.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn print_stats(index: &InvertedIndex) {
    println!("Documents: {}", index.num_docs());
    println!("Terms: {}", index.len());
    println!(
        "First {} terms found in a single document: {}",
        STATS_LIMIT,
        index.terms_in_one_doc(STATS_LIMIT).join(", ")
    );
    println!("Top {} terms by document frequency:", STATS_LIMIT);
    for (term, df) in index.terms_by_doc_freq(STATS_LIMIT) {
        println!("  {:<20} {}", term, df);
    }
}
