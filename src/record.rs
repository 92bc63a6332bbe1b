//! Log record model: the validated `LogRecord`, its key types, and the
//! presence checks that turn an arbitrary JSON value into one.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::RecordDefect;

pub const ROBOT_ID_FIELD: &str = "robotId";
pub const ERROR_CODE_FIELD: &str = "errorCode";
pub const DATE_FIELD: &str = "lastModifiedDate";

// =============================================================================
// Keys
// =============================================================================

/// Error code label. Numbers and strings share one key space, so `42`, `42.0`
/// and `"42"` are the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(String);

impl ErrorCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_json(value: &Value) -> Result<Self, RecordDefect> {
        match value {
            Value::Null => Err(RecordDefect::MissingErrorCode),
            Value::String(s) => Ok(Self(s.clone())),
            Value::Number(n) => number_text(n).map(Self).ok_or(RecordDefect::InvalidErrorCode),
            _ => Err(RecordDefect::InvalidErrorCode),
        }
    }

    /// Label used on chart slices.
    pub fn label(&self) -> String {
        format!("Error {}", self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Calendar day a record is filed under. Displays as zero-padded `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// `month` is 0-based (0 = January).
    pub fn from_calendar(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month.checked_add(1)?, day).map(Self)
    }

    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), Self::FORMAT).ok().map(Self)
    }

    /// Date portion of an ISO-8601 timestamp: everything before the first `T`,
    /// or the whole string when there is none. The time of day and any offset
    /// are dropped without conversion.
    pub fn from_timestamp(ts: &str) -> Option<Self> {
        let ts = ts.trim();
        let date = ts.split('T').next().unwrap_or(ts);
        Self::parse(date)
    }

    pub fn from_epoch_millis(ms: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| Self(dt.date_naive()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// 0-based month.
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateKey::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("bad date key: {s}")))
    }
}

// =============================================================================
// Records
// =============================================================================

/// A validated record, reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub robot_id: String,
    pub error_code: ErrorCode,
    pub date: DateKey,
}

impl LogRecord {
    pub fn new(robot_id: impl Into<String>, error_code: impl Into<ErrorCode>, date: DateKey) -> Self {
        Self {
            robot_id: robot_id.into(),
            error_code: error_code.into(),
            date,
        }
    }
}

/// One element of an uploaded document, as it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord(Value);

impl RawRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn validate(&self) -> Result<LogRecord, RecordDefect> {
        let obj = self.0.as_object().ok_or(RecordDefect::NotAnObject)?;

        let robot_id = match obj.get(ROBOT_ID_FIELD) {
            None | Some(Value::Null) => return Err(RecordDefect::MissingRobotId),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => number_text(n).ok_or(RecordDefect::InvalidRobotId)?,
            Some(_) => return Err(RecordDefect::InvalidRobotId),
        };

        let error_code = match obj.get(ERROR_CODE_FIELD) {
            None => return Err(RecordDefect::MissingErrorCode),
            Some(v) => ErrorCode::from_json(v)?,
        };

        let date = match obj.get(DATE_FIELD) {
            None | Some(Value::Null) => return Err(RecordDefect::MissingDate),
            Some(v) => date_key_from_json(v)?,
        };

        Ok(LogRecord {
            robot_id,
            error_code,
            date,
        })
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Text form of a numeric id or code: integral values print without a
/// fractional part, so `404`, `404.0` and `"404"` share one key.
fn number_text(n: &serde_json::Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        Some((f as i64).to_string())
    } else {
        Some(f.to_string())
    }
}

/// Accepts `{"$date": "<iso>"}`, `{"$date": <millis>}`,
/// `{"$date": {"$numberLong": "<millis>"}}`, or a bare ISO string.
fn date_key_from_json(value: &Value) -> Result<DateKey, RecordDefect> {
    let inner = match value {
        Value::Object(map) => match map.get("$date") {
            None | Some(Value::Null) => return Err(RecordDefect::MissingDate),
            Some(v) => v,
        },
        other => other,
    };

    let key = match inner {
        Value::String(s) => DateKey::from_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(DateKey::from_epoch_millis),
        Value::Object(map) => map
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(DateKey::from_epoch_millis),
        _ => None,
    };
    key.ok_or(RecordDefect::UnparseableDate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawRecord {
        RawRecord::new(v)
    }

    #[test]
    fn validates_well_formed_record() {
        let rec = raw(json!({
            "robotId": "R1",
            "errorCode": "E1",
            "lastModifiedDate": {"$date": "2024-03-05T10:00:00Z"}
        }))
        .validate()
        .unwrap();
        assert_eq!(rec.robot_id, "R1");
        assert_eq!(rec.error_code.as_str(), "E1");
        assert_eq!(rec.date.to_string(), "2024-03-05");
    }

    #[test]
    fn numeric_codes_share_key_space_with_strings() {
        assert_eq!(ErrorCode::from_json(&json!(42)).unwrap(), ErrorCode::from("42"));
        assert_eq!(ErrorCode::from_json(&json!(42.0)).unwrap(), ErrorCode::from("42"));
        assert_eq!(ErrorCode::from_json(&json!(4.5)).unwrap(), ErrorCode::from("4.5"));
        assert_eq!(ErrorCode::from_json(&json!(true)), Err(RecordDefect::InvalidErrorCode));
    }

    #[test]
    fn timestamp_keeps_date_portion_only() {
        let k = DateKey::from_timestamp("2024-12-31T23:59:59-05:00").unwrap();
        assert_eq!(k.to_string(), "2024-12-31");
        let k = DateKey::from_timestamp("2024-02-29").unwrap();
        assert_eq!(k.to_string(), "2024-02-29");
        assert!(DateKey::from_timestamp("2023-02-29T00:00:00Z").is_none());
        assert!(DateKey::from_timestamp("yesterday").is_none());
        assert!(DateKey::from_timestamp("2024-03-05 10:00:00").is_none());
    }

    #[test]
    fn extended_json_millis_forms() {
        let ms = 1_709_632_800_000i64; // 2024-03-05T10:00:00Z
        let a = raw(json!({"robotId": "R", "errorCode": 1, "lastModifiedDate": {"$date": ms}}));
        let b = raw(json!({
            "robotId": "R",
            "errorCode": 1,
            "lastModifiedDate": {"$date": {"$numberLong": ms.to_string()}}
        }));
        assert_eq!(a.validate().unwrap().date.to_string(), "2024-03-05");
        assert_eq!(b.validate().unwrap().date.to_string(), "2024-03-05");
    }

    #[test]
    fn presence_checks() {
        let date = json!({"$date": "2024-03-05T10:00:00Z"});
        assert_eq!(raw(json!(5)).validate(), Err(RecordDefect::NotAnObject));
        assert_eq!(
            raw(json!({"errorCode": "E", "lastModifiedDate": date})).validate(),
            Err(RecordDefect::MissingRobotId)
        );
        assert_eq!(
            raw(json!({"robotId": ["R"], "errorCode": "E", "lastModifiedDate": date})).validate(),
            Err(RecordDefect::InvalidRobotId)
        );
        assert_eq!(
            raw(json!({"robotId": true, "errorCode": "E", "lastModifiedDate": date})).validate(),
            Err(RecordDefect::InvalidRobotId)
        );
        assert_eq!(
            raw(json!({"robotId": "R", "lastModifiedDate": date})).validate(),
            Err(RecordDefect::MissingErrorCode)
        );
        assert_eq!(
            raw(json!({"robotId": "R", "errorCode": "E"})).validate(),
            Err(RecordDefect::MissingDate)
        );
        assert_eq!(
            raw(json!({"robotId": "R", "errorCode": "E", "lastModifiedDate": {}})).validate(),
            Err(RecordDefect::MissingDate)
        );
        assert_eq!(
            raw(json!({"robotId": "R", "errorCode": "E", "lastModifiedDate": {"$date": "soon"}}))
                .validate(),
            Err(RecordDefect::UnparseableDate)
        );
    }

    #[test]
    fn numeric_and_empty_robot_ids_are_kept() {
        let date = json!({"$date": "2024-03-05T10:00:00Z"});
        let rec = raw(json!({"robotId": 7, "errorCode": "E1", "lastModifiedDate": date}))
            .validate()
            .unwrap();
        assert_eq!(rec.robot_id, "7");
        let rec = raw(json!({"robotId": 7.0, "errorCode": "E1", "lastModifiedDate": date}))
            .validate()
            .unwrap();
        assert_eq!(rec.robot_id, "7");
        let rec = raw(json!({"robotId": "", "errorCode": "E1", "lastModifiedDate": date}))
            .validate()
            .unwrap();
        assert_eq!(rec.robot_id, "");
    }

    #[test]
    fn bare_timestamp_string_as_date() {
        let rec = raw(json!({
            "robotId": "R1",
            "errorCode": "E1",
            "lastModifiedDate": "2024-03-05T10:00:00Z"
        }))
        .validate()
        .unwrap();
        assert_eq!(rec.date.to_string(), "2024-03-05");
    }

    #[test]
    fn date_key_serializes_as_string() {
        let k = DateKey::from_calendar(2024, 0, 7).unwrap();
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"2024-01-07\"");
        let back: DateKey = serde_json::from_str("\"2024-01-07\"").unwrap();
        assert_eq!(back, k);
    }
}
