pub mod codec;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod index;
pub mod indexer;
pub mod query;
pub mod retrieval;
pub mod scoring;
pub mod tokenizer;

pub use error::{CoreError, Result};
pub use index::{DocId, InvertedIndex, Posting, WeightScheme};
pub use query::{DocumentVector, Query, QueryId};
