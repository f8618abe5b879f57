use crate::error::CoreError;
use crate::index::DocId;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

lazy_static! {
    static ref DOCNO: Regex = Regex::new(r"(?is)<DOCNO>(.*?)</DOCNO>").expect("valid regex");
    static ref TITLE: Regex = Regex::new(r"(?is)<TITLE>(.*?)</TITLE>").expect("valid regex");
    static ref TEXT: Regex = Regex::new(r"(?is)<TEXT>(.*?)</TEXT>").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

/// Parses one corpus file into a document. Files that cannot be read or
/// parsed yield `None`; readers log why.
pub trait CorpusReader: Send + Sync {
    fn read(&self, path: &Path) -> Option<Document>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    Cranfield,
    Json,
}

impl CorpusFormat {
    pub const EXPECTED: &'static str = "cranfield, json";

    pub fn reader(&self) -> Box<dyn CorpusReader> {
        match self {
            CorpusFormat::Cranfield => Box::new(CranfieldReader),
            CorpusFormat::Json => Box::new(JsonDocumentReader),
        }
    }
}

impl fmt::Display for CorpusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorpusFormat::Cranfield => "cranfield",
            CorpusFormat::Json => "json",
        })
    }
}

impl FromStr for CorpusFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cranfield" => Ok(CorpusFormat::Cranfield),
            "json" => Ok(CorpusFormat::Json),
            other => Err(CoreError::UnknownSelector {
                kind: "corpus format",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Cranfield collection: one file per document with `<DOCNO>`, `<TITLE>` and
/// `<TEXT>` elements. The id is the digits of DOCNO; the text is the title
/// followed by the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct CranfieldReader;

impl CranfieldReader {
    pub fn parse(&self, contents: &str) -> Option<Document> {
        let docno = DOCNO.captures(contents)?.get(1)?.as_str();
        let digits: String = docno.chars().filter(|c| c.is_ascii_digit()).collect();
        let id = digits.parse::<DocId>().ok()?;
        let title = capture(&TITLE, contents);
        let body = capture(&TEXT, contents);
        Some(Document { id, text: format!("{} {}", title.trim(), body.trim()) })
    }
}

impl CorpusReader for CranfieldReader {
    fn read(&self, path: &Path) -> Option<Document> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unable to read document");
                return None;
            }
        };
        let doc = self.parse(&contents);
        if doc.is_none() {
            tracing::warn!(path = %path.display(), "unable to parse document: missing or invalid DOCNO");
        }
        doc
    }
}

fn capture<'a>(re: &Regex, contents: &'a str) -> &'a str {
    re.captures(contents)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

#[derive(Debug, Deserialize)]
struct JsonDoc {
    id: DocId,
    #[serde(default)]
    title: Option<String>,
    text: String,
}

/// One JSON object per file: `{"id": 12, "title": "...", "text": "..."}`; `title` is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentReader;

impl CorpusReader for JsonDocumentReader {
    fn read(&self, path: &Path) -> Option<Document> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unable to read document");
                return None;
            }
        };
        match serde_json::from_str::<JsonDoc>(&contents) {
            Ok(doc) => {
                let text = match doc.title {
                    Some(title) => format!("{} {}", title, doc.text),
                    None => doc.text,
                };
                Some(Document { id: doc.id, text })
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unable to parse document");
                None
            }
        }
    }
}
