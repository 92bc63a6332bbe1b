//! Reading uploaded log documents.
//!
//! A document is either one record object or an array of them. Reading is the
//! only asynchronous step; parsing happens once the whole file is in memory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::aggregate::MergeReport;
use crate::error::IngestError;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::record::RawRecord;

/// File contents plus where they came from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source: String,
    pub sha256: String,
    pub text: String,
}

impl SourceDocument {
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            source: source.into(),
            sha256: sha256_hex(text.as_bytes()),
            text,
        }
    }

    pub fn bytes(&self) -> usize {
        self.text.len()
    }
}

/// Outcome of one successful ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub sha256: String,
    pub bytes: usize,
    pub ingested_at: String,
    pub merge: MergeReport,
}

impl IngestReport {
    /// One-line, user-facing summary.
    pub fn headline(&self) -> String {
        if self.merge.is_clean() {
            format!("Loaded {}: {} records", self.source, self.merge.accepted)
        } else {
            format!(
                "Loaded {}: {} records, {} skipped",
                self.source, self.merge.accepted, self.merge.skipped
            )
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Reads a whole file. No timeout and no cancellation.
pub async fn read_source(path: &Path) -> Result<SourceDocument, IngestError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sha256 = sha256_hex(&bytes);
    // Invalid UTF-8 sequences are replaced with U+FFFD.
    let text = String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    log(
        Level::Info,
        Domain::Ingest,
        "read",
        obj(&[
            ("path", v_str(&path.display().to_string())),
            ("bytes", json!(text.len())),
            ("sha256", v_str(&sha256)),
        ]),
    );
    Ok(SourceDocument {
        source: display_name(path),
        sha256,
        text,
    })
}

/// Parses a document into raw records. Fails only when the text is not JSON.
pub fn parse_document(text: &str) -> Result<Vec<RawRecord>, IngestError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let doc: Value = serde_json::from_str(text).map_err(|e| {
        log(
            Level::Warn,
            Domain::Ingest,
            "invalid_json",
            obj(&[("error", v_str(&e.to_string()))]),
        );
        IngestError::InvalidJson(e)
    })?;
    Ok(match doc {
        Value::Array(items) => items.into_iter().map(RawRecord::new).collect(),
        single => vec![RawRecord::new(single)],
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Expands `~/` and trims the path typed into the load prompt.
pub fn resolve_input_path(input: &str) -> PathBuf {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_and_single_documents() {
        let many = parse_document(r#"[{"robotId":"R1"},{"robotId":"R2"},3]"#).unwrap();
        assert_eq!(many.len(), 3);
        let one = parse_document(r#"{"robotId":"R1"}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].value()["robotId"], "R1");
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let text = "\u{FEFF}[{\"robotId\":\"R1\",\"errorCode\":\"E1\",\"lastModifiedDate\":{\"$date\":\"2024-03-05T10:00:00Z\"}}]";
        let records = parse_document(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].validate().unwrap().robot_id, "R1");
    }

    #[tokio::test]
    async fn non_utf8_file_reads_as_invalid_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.json");
        std::fs::write(&path, b"[{\"robotId\":\"R\xE9\"").unwrap();
        let doc = read_source(&path).await.unwrap();
        assert_eq!(doc.sha256, sha256_hex(b"[{\"robotId\":\"R\xE9\""));
        let err = parse_document(&doc.text).unwrap_err();
        assert!(matches!(err, IngestError::InvalidJson(_)));
    }

    #[test]
    fn invalid_json_is_a_parse_failure() {
        let err = parse_document("{not json").unwrap_err();
        assert!(matches!(err, IngestError::InvalidJson(_)));
    }

    #[test]
    fn sha256_is_stable() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let doc = SourceDocument::from_text("x.json", "abc");
        assert_eq!(doc.sha256, sha256_hex(b"abc"));
        assert_eq!(doc.bytes(), 3);
    }

    #[test]
    fn resolves_plain_paths() {
        assert_eq!(resolve_input_path("  logs/a.json "), PathBuf::from("logs/a.json"));
    }
}
