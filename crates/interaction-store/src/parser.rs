//! Parser for JSON-lines data files.
//!
//! The file-backed store keeps one JSON object per line:
//! - interactions.jsonl: `{"user_id", "taxon_id", "type", "confidence"?, "timestamp"?}`
//! - feedback.jsonl: `{"user_id", "recommended_taxon_id", "feedback_type", "algorithm_used"}`
//!
//! Candidate batches used by the CLI go through the same reader, either as
//! JSON lines or as a single JSON array.

use crate::error::{Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Label used in parse errors: the file name without its directory.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read the whole file, mapping a missing file to [`StoreError::FileNotFound`].
fn read_to_string(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(StoreError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(fs::read_to_string(path)?)
}

/// Parse a JSON-lines file into records.
///
/// Blank lines and lines starting with `#` are skipped. The first malformed
/// line aborts parsing with its 1-based line number.
pub fn parse_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = read_to_string(path)?;
    let file = file_label(path);
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }

        let record = serde_json::from_str(line_trimmed).map_err(|e| StoreError::ParseError {
            file: file.clone(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Parse a file holding either a JSON array of records or JSON lines.
pub fn parse_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = read_to_string(path)?;
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(&content).map_err(|e| StoreError::ParseError {
            file: file_label(path),
            line: e.line(),
            reason: e.to_string(),
        });
    }
    parse_json_lines(path)
}

/// Write records as JSON lines, replacing the file.
pub fn write_json_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        let line = serde_json::to_string(record).map_err(|e| StoreError::InvalidValue {
            field: file_label(path),
            value: e.to_string(),
        })?;
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interaction, InteractionKind};

    #[test]
    fn test_parse_json_lines_skips_blank_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interactions.jsonl");
        fs::write(
            &path,
            "# seed data\n{\"user_id\":\"1\",\"taxon_id\":\"10\",\"type\":\"favorite\"}\n\n{\"user_id\":\"2\",\"taxon_id\":\"11\",\"type\":\"view\"}\n",
        )
        .unwrap();

        let records: Vec<Interaction> = parse_json_lines(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, InteractionKind::Favorite);
        assert_eq!(records[1].user_id, "2");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interactions.jsonl");
        fs::write(
            &path,
            "{\"user_id\":\"1\",\"taxon_id\":\"10\",\"type\":\"favorite\"}\n{not json}\n",
        )
        .unwrap();

        let err = parse_json_lines::<Interaction>(&path).unwrap_err();
        match err {
            StoreError::ParseError { file, line, .. } => {
                assert_eq!(file, "interactions.jsonl");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = parse_json_lines::<Interaction>(Path::new("/nonexistent/interactions.jsonl"))
            .unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound { .. }));
    }

    #[test]
    fn test_parse_records_accepts_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(
            &path,
            "[{\"user_id\":\"1\",\"taxon_id\":\"10\",\"type\":\"identify\",\"confidence\":0.91}]",
        )
        .unwrap();

        let records: Vec<Interaction> = parse_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, Some(0.91));
    }
}
