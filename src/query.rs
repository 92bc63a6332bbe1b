//! Day lookups for the chart panels.

use serde::Serialize;
use serde_json::json;

use crate::aggregate::{AggregateIndex, Histogram};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::record::DateKey;

/// Both histograms for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayView {
    pub date: DateKey,
    /// All robots.
    pub total: Histogram,
    /// The robot the view was asked for, if any.
    pub robot_id: Option<String>,
    /// `None` when no robot was asked for or it logged nothing that day.
    pub robot: Option<Histogram>,
}

impl DayView {
    pub fn has_robot_data(&self) -> bool {
        self.robot.is_some()
    }
}

/// `month` is 0-based. Returns `None` when the day has no data, including
/// when the arguments do not name a real date.
pub fn query_day(
    index: &AggregateIndex,
    year: i32,
    month: u32,
    day: u32,
    selected_robot: Option<&str>,
) -> Option<DayView> {
    let key = DateKey::from_calendar(year, month, day)?;
    query_date(index, key, selected_robot)
}

pub fn query_date(index: &AggregateIndex, date: DateKey, selected_robot: Option<&str>) -> Option<DayView> {
    let Some(day) = index.get(&date) else {
        log(
            Level::Debug,
            Domain::Query,
            "empty_day",
            obj(&[("date", json!(date))]),
        );
        return None;
    };

    let robot = selected_robot.and_then(|r| day.robot(r)).cloned();
    log(
        Level::Debug,
        Domain::Query,
        "day",
        obj(&[
            ("date", json!(date)),
            ("robot_id", selected_robot.map(v_str).unwrap_or(serde_json::Value::Null)),
            ("codes", json!(day.total_counts.len())),
            ("robot_hit", json!(robot.is_some())),
        ]),
    );

    Some(DayView {
        date,
        total: day.total_counts.clone(),
        robot_id: selected_robot.map(str::to_string),
        robot,
    })
}
