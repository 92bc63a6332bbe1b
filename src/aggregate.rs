//! Per-day, per-robot error-code histograms and the fold that builds them.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::json;

use crate::error::RecordDefect;
use crate::logging::{log, obj, v_str, Domain, Level, ProfileScope};
use crate::record::{DateKey, ErrorCode, LogRecord, RawRecord};

// =============================================================================
// Histogram
// =============================================================================

/// Error-code tally that remembers the order in which codes first appeared.
///
/// Equality ignores that order: two histograms are equal when every code has the
/// same count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: IndexMap<ErrorCode, u64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, code: &ErrorCode) {
        self.add(code, 1);
    }

    pub fn add(&mut self, code: &ErrorCode, n: u64) {
        match self.counts.get_mut(code) {
            Some(c) => *c += n,
            None => {
                self.counts.insert(code.clone(), n);
            }
        }
    }

    pub fn get(&self, code: &ErrorCode) -> u64 {
        self.counts.get(code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &ErrorCode> {
        self.counts.keys()
    }

    /// `(code, count)` pairs in first-occurrence order.
    pub fn entries(&self) -> impl Iterator<Item = (&ErrorCode, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn to_pairs(&self) -> Vec<(ErrorCode, u64)> {
        self.entries().map(|(k, v)| (k.clone(), v)).collect()
    }

    /// Highest count first; ties keep first-occurrence order.
    pub fn sorted_by_count(&self) -> Vec<(ErrorCode, u64)> {
        let mut pairs = self.to_pairs();
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs
    }
}

impl FromIterator<(ErrorCode, u64)> for Histogram {
    fn from_iter<I: IntoIterator<Item = (ErrorCode, u64)>>(iter: I) -> Self {
        let mut h = Histogram::new();
        for (code, n) in iter {
            h.add(&code, n);
        }
        h
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            code: &'a ErrorCode,
            count: u64,
        }
        serializer.collect_seq(self.entries().map(|(code, count)| Entry { code, count }))
    }
}

// =============================================================================
// Day aggregates
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAggregate {
    pub total_counts: Histogram,
    pub per_robot_counts: IndexMap<String, Histogram>,
}

impl DayAggregate {
    fn record(&mut self, robot_id: &str, code: &ErrorCode) {
        self.total_counts.increment(code);
        match self.per_robot_counts.get_mut(robot_id) {
            Some(h) => h.increment(code),
            None => {
                let mut h = Histogram::new();
                h.increment(code);
                self.per_robot_counts.insert(robot_id.to_string(), h);
            }
        }
    }

    pub fn robot(&self, robot_id: &str) -> Option<&Histogram> {
        self.per_robot_counts.get(robot_id)
    }

    pub fn record_count(&self) -> u64 {
        self.total_counts.total()
    }
}

impl Serialize for DayAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let per_robot: Vec<_> = self
            .per_robot_counts
            .iter()
            .map(|(robot, h)| json!({"robot_id": robot, "counts": h}))
            .collect();
        let mut s = serializer.serialize_struct("DayAggregate", 2)?;
        s.serialize_field("total_counts", &self.total_counts)?;
        s.serialize_field("per_robot_counts", &per_robot)?;
        s.end()
    }
}

/// Every day that has data, in chronological order. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateIndex {
    days: BTreeMap<DateKey, DayAggregate>,
}

impl AggregateIndex {
    pub fn get(&self, key: &DateKey) -> Option<&DayAggregate> {
        self.days.get(key)
    }

    pub fn contains(&self, key: &DateKey) -> bool {
        self.days.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &DayAggregate)> {
        self.days.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DateKey> {
        self.days.keys()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_day(&self) -> Option<DateKey> {
        self.days.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<DateKey> {
        self.days.keys().next_back().copied()
    }

    pub fn record_count(&self) -> u64 {
        self.days.values().map(DayAggregate::record_count).sum()
    }

    fn entry(&mut self, key: DateKey) -> &mut DayAggregate {
        self.days.entry(key).or_default()
    }
}

/// Distinct robot ids in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RobotSet {
    robots: IndexSet<String>,
}

impl RobotSet {
    /// Returns true when the robot was not yet known.
    pub fn insert(&mut self, robot_id: &str) -> bool {
        if self.robots.contains(robot_id) {
            return false;
        }
        self.robots.insert(robot_id.to_string())
    }

    pub fn contains(&self, robot_id: &str) -> bool {
        self.robots.contains(robot_id)
    }

    pub fn first(&self) -> Option<&str> {
        self.robots.first().map(String::as_str)
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.robots.get_index(i).map(String::as_str)
    }

    pub fn position(&self, robot_id: &str) -> Option<usize> {
        self.robots.get_index_of(robot_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.robots.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }
}

// =============================================================================
// Merge
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefectTally {
    pub defect: RecordDefect,
    pub count: usize,
    /// Position of the first record with this defect within its batch.
    pub first_index: usize,
}

/// What a merge did with its batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub accepted: usize,
    pub skipped: usize,
    pub defects: Vec<DefectTally>,
    pub new_robots: Vec<String>,
    pub days_touched: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }
}

/// Owns the index and robot set and folds batches into them.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    index: AggregateIndex,
    robots: RobotSet,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &AggregateIndex {
        &self.index
    }

    pub fn robots(&self) -> &RobotSet {
        &self.robots
    }

    /// Validates and folds a batch. Malformed records are skipped and tallied;
    /// anything already counted stays counted.
    pub fn merge<I>(&mut self, records: I) -> MergeReport
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let _scope = ProfileScope::new("aggregate", "merge");
        let mut report = MergeReport::default();
        let mut defects: BTreeMap<RecordDefect, DefectTally> = BTreeMap::new();
        let mut touched = BTreeSet::new();

        for (i, raw) in records.into_iter().enumerate() {
            match raw.validate() {
                Ok(rec) => {
                    touched.insert(rec.date);
                    if self.apply(&rec) {
                        report.new_robots.push(rec.robot_id);
                    }
                    report.accepted += 1;
                }
                Err(defect) => {
                    log(
                        Level::Debug,
                        Domain::Aggregate,
                        "record_skipped",
                        obj(&[("index", json!(i)), ("defect", v_str(defect.as_str()))]),
                    );
                    defects
                        .entry(defect)
                        .or_insert(DefectTally {
                            defect,
                            count: 0,
                            first_index: i,
                        })
                        .count += 1;
                    report.skipped += 1;
                }
            }
        }

        report.defects = defects.into_values().collect();
        report.days_touched = touched.len();
        self.log_merge(&report);
        report
    }

    /// Folds records that are already validated.
    pub fn merge_records<I>(&mut self, records: I) -> MergeReport
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut report = MergeReport::default();
        let mut touched = BTreeSet::new();
        for rec in records {
            touched.insert(rec.date);
            if self.apply(&rec) {
                report.new_robots.push(rec.robot_id);
            }
            report.accepted += 1;
        }
        report.days_touched = touched.len();
        self.log_merge(&report);
        report
    }

    /// Counts one record. Returns true when its robot was seen for the first time.
    pub fn apply(&mut self, rec: &LogRecord) -> bool {
        self.index.entry(rec.date).record(&rec.robot_id, &rec.error_code);
        self.robots.insert(&rec.robot_id)
    }

    fn log_merge(&self, report: &MergeReport) {
        let level = if report.is_clean() { Level::Info } else { Level::Warn };
        log(
            level,
            Domain::Aggregate,
            "merge",
            obj(&[
                ("accepted", json!(report.accepted)),
                ("skipped", json!(report.skipped)),
                ("new_robots", json!(report.new_robots)),
                ("days_touched", json!(report.days_touched)),
                ("days_total", json!(self.index.len())),
                ("robots_total", json!(self.robots.len())),
            ]),
        );
    }
}
