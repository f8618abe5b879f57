use crate::index::WeightScheme;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("malformed index header {0:?}: expected `<tokenizer> <document count>`")]
    MalformedHeader(String),

    #[error("index is empty: missing header line")]
    MissingHeader,

    #[error("malformed relevance judgment on line {line}: {content:?}")]
    MalformedJudgment { line: usize, content: String },

    #[error("none of the {lines} posting lines could be read as {scheme} weights")]
    SchemeMismatch { scheme: WeightScheme, lines: usize },

    #[error("unknown {kind} {value:?} (expected one of: {expected})")]
    UnknownSelector {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid evaluation configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io { path: path.into(), source }
    }
}
