use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::IngestDocument;

/// Read a JSONL corpus: one [`IngestDocument`] object per line.
///
/// Blank lines are skipped. A malformed line fails the whole read with its
/// 1-based line number.
pub fn read_corpus(path: &Path) -> Result<Vec<IngestDocument>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open corpus {}", path.display()))?;
    parse_corpus(BufReader::new(file))
        .with_context(|| format!("Failed to read corpus {}", path.display()))
}

pub fn parse_corpus<R: BufRead>(reader: R) -> Result<Vec<IngestDocument>> {
    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: IngestDocument = serde_json::from_str(&line)
            .with_context(|| format!("Invalid document on line {}", index + 1))?;
        documents.push(document);
    }
    Ok(documents)
}
