//! The aggregation service: index, robot set and selection behind one owner.

use std::collections::BTreeSet;

use serde_json::json;

use crate::aggregate::{AggregateIndex, Aggregator, MergeReport, RobotSet};
use crate::calendar::{self, MonthLayout};
use crate::error::{CalendarError, IngestError, SelectionError};
use crate::ingest::{self, IngestReport, SourceDocument};
use crate::logging::{log, obj, ts_now, v_str, Domain, Level};
use crate::query::{self, DayView};
use crate::record::{DateKey, LogRecord, RawRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_robot: Option<String>,
}

/// Session state for one user: everything ingested so far plus the robot
/// selection. Nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct ErrorCalendar {
    aggregator: Aggregator,
    selection: SelectionState,
    history: Vec<IngestReport>,
}

impl ErrorCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    pub fn merge<I>(&mut self, records: I) -> MergeReport
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let report = self.aggregator.merge(records);
        self.default_selection();
        report
    }

    pub fn merge_records<I>(&mut self, records: I) -> MergeReport
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let report = self.aggregator.merge_records(records);
        self.default_selection();
        report
    }

    /// Parses and merges a whole document. On invalid JSON nothing changes.
    pub fn ingest_document(&mut self, doc: &SourceDocument) -> Result<IngestReport, IngestError> {
        let records = ingest::parse_document(&doc.text)?;
        let merge = self.merge(records);
        let report = IngestReport {
            source: doc.source.clone(),
            sha256: doc.sha256.clone(),
            bytes: doc.bytes(),
            ingested_at: ts_now(),
            merge,
        };
        log(
            Level::Info,
            Domain::Ingest,
            "ingested",
            obj(&[
                ("source", v_str(&report.source)),
                ("sha256", v_str(&report.sha256)),
                ("accepted", json!(report.merge.accepted)),
                ("skipped", json!(report.merge.skipped)),
            ]),
        );
        self.history.push(report.clone());
        Ok(report)
    }

    pub fn ingest_str(&mut self, source: &str, text: &str) -> Result<IngestReport, IngestError> {
        self.ingest_document(&SourceDocument::from_text(source, text))
    }

    pub fn history(&self) -> &[IngestReport] {
        &self.history
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    fn default_selection(&mut self) {
        if self.selection.selected_robot.is_none() {
            if let Some(first) = self.aggregator.robots().first() {
                self.selection.selected_robot = Some(first.to_string());
                log(
                    Level::Debug,
                    Domain::Aggregate,
                    "default_robot",
                    obj(&[("robot_id", v_str(first))]),
                );
            }
        }
    }

    pub fn select_robot(&mut self, robot_id: &str) -> Result<(), SelectionError> {
        if !self.aggregator.robots().contains(robot_id) {
            return Err(SelectionError::UnknownRobot(robot_id.to_string()));
        }
        self.selection.selected_robot = Some(robot_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.selected_robot = None;
    }

    pub fn selected_robot(&self) -> Option<&str> {
        self.selection.selected_robot.as_deref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Moves the selection `step` places through the robot set, wrapping.
    pub fn cycle_robot(&mut self, step: isize) -> Option<&str> {
        let robots = self.aggregator.robots();
        if robots.is_empty() {
            return None;
        }
        let n = robots.len() as isize;
        let current = self
            .selected_robot()
            .and_then(|r| robots.position(r))
            .map(|i| i as isize)
            .unwrap_or(if step >= 0 { -1 } else { 0 });
        let next = (current + step).rem_euclid(n) as usize;
        self.selection.selected_robot = robots.get(next).map(str::to_string);
        self.selected_robot()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn index(&self) -> &AggregateIndex {
        self.aggregator.index()
    }

    pub fn robots(&self) -> &RobotSet {
        self.aggregator.robots()
    }

    pub fn days_with_data(&self, year: i32, month: u32) -> Result<BTreeSet<u32>, CalendarError> {
        calendar::days_with_data(self.index(), year, month)
    }

    pub fn month_layout(&self, year: i32, month: u32) -> Result<MonthLayout, CalendarError> {
        MonthLayout::build(self.index(), year, month)
    }

    pub fn year_layouts(&self, year: i32) -> Result<Vec<MonthLayout>, CalendarError> {
        calendar::year_layouts(self.index(), year)
    }

    /// Month is 0-based; `None` month means the whole year.
    pub fn layouts(&self, year: i32, month: Option<u32>) -> Result<Vec<MonthLayout>, CalendarError> {
        match month {
            Some(m) => Ok(vec![self.month_layout(year, m)?]),
            None => self.year_layouts(year),
        }
    }

    pub fn query_day(&self, year: i32, month: u32, day: u32, robot: Option<&str>) -> Option<DayView> {
        query::query_day(self.index(), year, month, day, robot)
    }

    /// Query for the current selection.
    pub fn query_selected(&self, date: DateKey) -> Option<DayView> {
        query::query_date(self.index(), date, self.selected_robot())
    }

    pub fn query_date(&self, date: DateKey, robot: Option<&str>) -> Option<DayView> {
        query::query_date(self.index(), date, robot)
    }

    pub fn day_keys(&self) -> impl Iterator<Item = &DateKey> {
        self.index().keys()
    }

    pub fn date_range(&self) -> Option<(DateKey, DateKey)> {
        Some((self.index().first_day()?, self.index().last_day()?))
    }

    pub fn record_count(&self) -> u64 {
        self.index().record_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"robotId":"R1","errorCode":"E1","lastModifiedDate":{"$date":"2024-03-05T10:00:00Z"}},
        {"robotId":"R2","errorCode":"E1","lastModifiedDate":{"$date":"2024-03-05T11:00:00Z"}}
    ]"#;

    #[test]
    fn first_robot_becomes_default_selection() {
        let mut cal = ErrorCalendar::new();
        assert_eq!(cal.selected_robot(), None);
        cal.ingest_str("a.json", SAMPLE).unwrap();
        assert_eq!(cal.selected_robot(), Some("R1"));
    }

    #[test]
    fn later_merges_keep_existing_selection() {
        let mut cal = ErrorCalendar::new();
        cal.ingest_str("a.json", SAMPLE).unwrap();
        cal.select_robot("R2").unwrap();
        cal.ingest_str(
            "b.json",
            r#"{"robotId":"R0","errorCode":1,"lastModifiedDate":{"$date":"2024-03-06"}}"#,
        )
        .unwrap();
        assert_eq!(cal.selected_robot(), Some("R2"));
        assert_eq!(cal.robots().iter().collect::<Vec<_>>(), vec!["R1", "R2", "R0"]);
    }

    #[test]
    fn unknown_robot_cannot_be_selected() {
        let mut cal = ErrorCalendar::new();
        cal.ingest_str("a.json", SAMPLE).unwrap();
        assert_eq!(
            cal.select_robot("R9"),
            Err(SelectionError::UnknownRobot("R9".to_string()))
        );
        assert_eq!(cal.selected_robot(), Some("R1"));
    }

    #[test]
    fn invalid_json_changes_nothing() {
        let mut cal = ErrorCalendar::new();
        cal.ingest_str("a.json", SAMPLE).unwrap();
        let before = cal.index().clone();
        assert!(cal.ingest_str("bad.json", "[{").is_err());
        assert_eq!(cal.index(), &before);
        assert_eq!(cal.history().len(), 1);
    }

    #[test]
    fn cycle_robot_wraps_both_ways() {
        let mut cal = ErrorCalendar::new();
        assert_eq!(cal.cycle_robot(1), None);
        cal.ingest_str("a.json", SAMPLE).unwrap();
        assert_eq!(cal.cycle_robot(1), Some("R2"));
        assert_eq!(cal.cycle_robot(1), Some("R1"));
        assert_eq!(cal.cycle_robot(-1), Some("R2"));
        cal.clear_selection();
        assert_eq!(cal.cycle_robot(1), Some("R1"));
        cal.clear_selection();
        assert_eq!(cal.cycle_robot(-1), Some("R2"));
    }

    #[test]
    fn layouts_for_month_or_year() {
        let mut cal = ErrorCalendar::new();
        cal.ingest_str("a.json", SAMPLE).unwrap();
        assert_eq!(cal.layouts(2024, Some(2)).unwrap().len(), 1);
        assert_eq!(cal.layouts(2024, None).unwrap().len(), 12);
        assert!(cal.layouts(2024, Some(12)).is_err());
        let (first, last) = cal.date_range().unwrap();
        assert_eq!(first.to_string(), "2024-03-05");
        assert_eq!(last, first);
    }
}
