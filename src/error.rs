use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a whole ingestion attempt. Nothing is merged when one of these is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Why a single record was left out of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum RecordDefect {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing robotId")]
    MissingRobotId,
    #[error("robotId is not a string or number")]
    InvalidRobotId,
    #[error("missing errorCode")]
    MissingErrorCode,
    #[error("errorCode is neither a string nor a number")]
    InvalidErrorCode,
    #[error("missing lastModifiedDate")]
    MissingDate,
    #[error("lastModifiedDate has no parseable date portion")]
    UnparseableDate,
}

impl RecordDefect {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordDefect::NotAnObject => "not_an_object",
            RecordDefect::MissingRobotId => "missing_robot_id",
            RecordDefect::InvalidRobotId => "invalid_robot_id",
            RecordDefect::MissingErrorCode => "missing_error_code",
            RecordDefect::InvalidErrorCode => "invalid_error_code",
            RecordDefect::MissingDate => "missing_date",
            RecordDefect::UnparseableDate => "unparseable_date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("month index {0} is out of range (expected 0-11)")]
    InvalidMonth(u32),
    #[error("year {0} is outside the supported calendar range")]
    InvalidYear(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown robot: {0}")]
    UnknownRobot(String),
}
