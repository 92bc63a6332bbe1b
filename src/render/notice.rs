use serde::Serialize;

use crate::error::IngestError;
use crate::ingest::IngestReport;
use crate::record::DateKey;

pub const INVALID_JSON: &str = "Invalid JSON file.";
pub const NO_DATE_DATA: &str = "No data available for this date.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Loaded { source: String, accepted: usize, skipped: usize },
    InvalidJson { source: String, detail: String },
    Unreadable { source: String, detail: String },
    NoDataForDate { date: DateKey },
    LoadInProgress,
    Info { text: String },
}

impl Notice {
    pub fn loaded(report: &IngestReport) -> Self {
        Notice::Loaded {
            source: report.source.clone(),
            accepted: report.merge.accepted,
            skipped: report.merge.skipped,
        }
    }

    pub fn ingest_failed(source: &str, err: &IngestError) -> Self {
        match err {
            IngestError::InvalidJson(e) => Notice::InvalidJson {
                source: source.to_string(),
                detail: e.to_string(),
            },
            IngestError::Io { source: e, .. } => Notice::Unreadable {
                source: source.to_string(),
                detail: e.to_string(),
            },
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Notice::Loaded { skipped: 0, .. } | Notice::Info { .. } => Severity::Info,
            Notice::Loaded { .. } | Notice::NoDataForDate { .. } | Notice::LoadInProgress => {
                Severity::Warn
            }
            Notice::InvalidJson { .. } | Notice::Unreadable { .. } => Severity::Error,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Notice::Loaded { source, accepted, skipped: 0 } => {
                format!("JSON file loaded successfully: {} ({} records)", source, accepted)
            }
            Notice::Loaded { source, accepted, skipped } => format!(
                "JSON file loaded: {} ({} records, {} malformed records skipped)",
                source, accepted, skipped
            ),
            Notice::InvalidJson { source, detail } => {
                format!("{} {} ({})", INVALID_JSON, source, detail)
            }
            Notice::Unreadable { source, detail } => format!("Cannot read {}: {}", source, detail),
            Notice::NoDataForDate { date } => format!("{} ({})", NO_DATE_DATA, date),
            Notice::LoadInProgress => "A file is already loading.".to_string(),
            Notice::Info { text } => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_notice_mentions_skips() {
        let clean = Notice::Loaded { source: "a.json".into(), accepted: 3, skipped: 0 };
        assert_eq!(clean.severity(), Severity::Info);
        assert!(clean.text().contains("successfully"));

        let partial = Notice::Loaded { source: "a.json".into(), accepted: 3, skipped: 2 };
        assert_eq!(partial.severity(), Severity::Warn);
        assert!(partial.text().contains("2 malformed records skipped"));
    }

    #[test]
    fn invalid_json_notice() {
        let err = IngestError::InvalidJson(serde_json::from_str::<serde_json::Value>("[").unwrap_err());
        let n = Notice::ingest_failed("bad.json", &err);
        assert_eq!(n.severity(), Severity::Error);
        assert!(n.text().starts_with(INVALID_JSON));
    }

    #[test]
    fn empty_day_notice() {
        let n = Notice::NoDataForDate { date: DateKey::parse("2024-01-02").unwrap() };
        assert_eq!(n.text(), "No data available for this date. (2024-01-02)");
    }
}
