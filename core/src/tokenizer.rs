use crate::error::{CoreError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex");
    static ref ALPHA_RUN: Regex = Regex::new(r"\p{L}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref DEFAULT_STOPWORDS: HashSet<String> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().map(|w| w.to_string()).collect()
    };
}

/// Turns raw text into the ordered sequence of index terms.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Registry entry this tokenizer was built from. Written into the index header.
    fn kind(&self) -> TokenizerKind;
}

/// Closed set of tokenizers an index can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizerKind {
    Complex,
    Simple,
}

impl TokenizerKind {
    pub const EXPECTED: &'static str = "ComplexTokenizer, SimpleTokenizer";

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenizerKind::Complex => "ComplexTokenizer",
            TokenizerKind::Simple => "SimpleTokenizer",
        }
    }

    /// Construct the tokenizer. `stopwords` only applies to [`TokenizerKind::Complex`];
    /// without it the built-in English list is used.
    pub fn build(&self, stopwords: Option<&Path>) -> Result<Box<dyn Tokenizer>> {
        Ok(match self {
            TokenizerKind::Complex => match stopwords {
                Some(path) => Box::new(ComplexTokenizer::from_stopwords_file(path)?),
                None => Box::new(ComplexTokenizer::new()),
            },
            TokenizerKind::Simple => Box::new(SimpleTokenizer),
        })
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ComplexTokenizer" | "complex" => Ok(TokenizerKind::Complex),
            "SimpleTokenizer" | "simple" => Ok(TokenizerKind::Simple),
            other => Err(CoreError::UnknownSelector {
                kind: "tokenizer",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// NFKC + lowercase, split on non-alphanumerics and on digit/letter boundaries,
/// stopword removal and English Snowball stemming.
#[derive(Debug, Clone)]
pub struct ComplexTokenizer {
    stopwords: HashSet<String>,
}

impl ComplexTokenizer {
    pub fn new() -> Self {
        Self { stopwords: DEFAULT_STOPWORDS.clone() }
    }

    pub fn with_stopwords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { stopwords }
    }

    /// One stopword per line.
    pub fn from_stopwords_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Ok(Self::with_stopwords(contents.lines()))
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }
}

impl Default for ComplexTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for ComplexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for word in NON_ALNUM.split(&normalized) {
            for token in split_digit_boundaries(word) {
                if self.is_stopword(token) {
                    continue;
                }
                tokens.push(STEMMER.stem(token).to_string());
            }
        }
        tokens
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::Complex
    }
}

/// Lowercased alphabetic runs of at least three characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        ALPHA_RUN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.chars().count() >= 3)
            .map(str::to_string)
            .collect()
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::Simple
    }
}

/// Splits "b747aircraft" into ["b", "747", "aircraft"]. Empty input yields nothing.
fn split_digit_boundaries(word: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;
    for (i, c) in word.char_indices() {
        let digit = c.is_numeric();
        if let Some(p) = prev_digit {
            if p != digit {
                parts.push(&word[start..i]);
                start = i;
            }
        }
        prev_digit = Some(digit);
    }
    if start < word.len() {
        parts.push(&word[start..]);
    }
    parts
}
