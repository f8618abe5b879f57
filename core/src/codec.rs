//! Line-oriented text format of an [`InvertedIndex`]:
//!
//! ```text
//! <tokenizer> <document count>
//! <term> <doc>:<weight>,<doc>:<weight>,...
//! ```
//!
//! Terms are written in lexicographic order and each posting list in ascending
//! document order. Frequency weights are integers; normalized weights carry
//! five decimals.

use crate::error::{CoreError, Result};
use crate::index::{DocId, InvertedIndex, Posting, WeightScheme};
use crate::tokenizer::TokenizerKind;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn write_index<W: Write>(mut writer: W, index: &InvertedIndex) -> Result<()> {
    writeln!(writer, "{} {}", index.tokenizer(), index.num_docs())?;

    let scheme = index.scheme();
    let mut line = String::new();
    for term in index.sorted_terms() {
        let mut postings: Vec<Posting> = index.postings(term).unwrap_or_default().to_vec();
        postings.sort_by_key(|p| p.doc_id);

        line.clear();
        line.push_str(term);
        line.push(' ');
        for (i, p) in postings.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&p.doc_id.to_string());
            line.push(':');
            line.push_str(&scheme.format_weight(p.weight));
        }
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_index(path: &Path, index: &InvertedIndex) -> Result<()> {
    let file = File::create(path).map_err(|e| CoreError::io(path, e))?;
    write_index(BufWriter::new(file), index).map_err(|e| match e {
        CoreError::Stream(source) => CoreError::io(path, source),
        other => other,
    })?;
    tracing::info!(path = %path.display(), num_terms = index.len(), num_docs = index.num_docs(), "index saved");
    Ok(())
}

/// Parse an index whose weights follow `scheme`.
///
/// Malformed postings are skipped with a warning; a malformed header is fatal,
/// and so is a body in which no posting parses under `scheme`.
pub fn read_index<R: BufRead>(reader: R, scheme: WeightScheme) -> Result<InvertedIndex> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(CoreError::MissingHeader),
    };
    let (tokenizer, num_docs) = parse_header(&header)?;

    let mut index = InvertedIndex::new(tokenizer, scheme);
    index.set_num_docs(num_docs);

    let mut term_lines = 0;
    for (n, line) in lines.enumerate() {
        let line = line?;
        let line_no = n + 2;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        term_lines += 1;
        let Some((term, list)) = line.split_once(' ') else {
            tracing::warn!(line = line_no, term = line, "term without postings, skipping");
            continue;
        };

        let mut postings = Vec::new();
        for pair in list.split(',') {
            match parse_posting(pair.trim(), scheme) {
                Some(p) => postings.push(p),
                None => tracing::warn!(line = line_no, term, posting = pair, "malformed posting, skipping"),
            }
        }
        index.insert_postings(term.to_string(), postings);
    }
    if term_lines > 0 && index.is_empty() {
        return Err(CoreError::SchemeMismatch { scheme, lines: term_lines });
    }
    Ok(index)
}

pub fn load_index(path: &Path, scheme: WeightScheme) -> Result<InvertedIndex> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let index = read_index(BufReader::new(file), scheme).map_err(|e| match e {
        CoreError::Stream(source) => CoreError::io(path, source),
        other => other,
    })?;
    tracing::info!(
        path = %path.display(),
        tokenizer = %index.tokenizer(),
        num_terms = index.len(),
        num_docs = index.num_docs(),
        "index loaded"
    );
    Ok(index)
}

/// Guess the weighting of an index from its first posting: normalized weights
/// are written with a decimal point, frequencies never are. An index without
/// postings reads as [`WeightScheme::Frequency`].
pub fn detect_scheme<R: BufRead>(reader: R) -> Result<WeightScheme> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(CoreError::MissingHeader),
    };
    parse_header(&header)?;
    for line in lines {
        let line = line?;
        let first = line
            .split_once(' ')
            .and_then(|(_, list)| list.split(',').next())
            .and_then(|pair| pair.split_once(':'));
        if let Some((_, weight)) = first {
            return Ok(if weight.contains('.') { WeightScheme::Weighted } else { WeightScheme::Frequency });
        }
    }
    Ok(WeightScheme::Frequency)
}

pub fn detect_scheme_of(path: &Path) -> Result<WeightScheme> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    detect_scheme(BufReader::new(file)).map_err(|e| match e {
        CoreError::Stream(source) => CoreError::io(path, source),
        other => other,
    })
}

fn parse_header(header: &str) -> Result<(TokenizerKind, u32)> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(tokenizer), Some(count), None) => {
            let tokenizer = tokenizer.parse::<TokenizerKind>()?;
            let num_docs = count
                .parse::<u32>()
                .map_err(|_| CoreError::MalformedHeader(header.to_string()))?;
            Ok((tokenizer, num_docs))
        }
        _ => Err(CoreError::MalformedHeader(header.to_string())),
    }
}

fn parse_posting(pair: &str, scheme: WeightScheme) -> Option<Posting> {
    let (doc, weight) = pair.split_once(':')?;
    let doc_id = doc.trim().parse::<DocId>().ok()?;
    let weight = match scheme {
        WeightScheme::Frequency => weight.trim().parse::<u32>().ok()? as f64,
        WeightScheme::Weighted => {
            let w = weight.trim().parse::<f64>().ok()?;
            if !w.is_finite() {
                return None;
            }
            w
        }
    };
    Some(Posting::new(doc_id, weight))
}
