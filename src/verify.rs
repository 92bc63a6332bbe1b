use crate::aggregate::{AggregateIndex, Histogram, RobotSet};
use crate::record::DateKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub date: Option<DateKey>,
    pub msg: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.date {
            Some(d) => write!(f, "{}: {}", d, self.msg),
            None => f.write_str(&self.msg),
        }
    }
}

/// Day totals must equal the sum of the per-robot histograms, code by code.
pub fn assert_histogram_consistency(index: &AggregateIndex) -> Result<(), InvariantViolation> {
    for (date, day) in index.iter() {
        let mut summed = Histogram::new();
        for h in day.per_robot_counts.values() {
            for (code, n) in h.entries() {
                summed.add(code, n);
            }
        }
        if summed != day.total_counts {
            return Err(InvariantViolation {
                date: Some(*date),
                msg: "total counts differ from the per-robot sum".to_string(),
            });
        }
        if day.total_counts.entries().any(|(_, n)| n == 0) {
            return Err(InvariantViolation {
                date: Some(*date),
                msg: "zero count in histogram".to_string(),
            });
        }
    }
    Ok(())
}

/// Every robot that appears in a day is a member of the robot set.
pub fn assert_robot_membership(index: &AggregateIndex, robots: &RobotSet) -> Result<(), InvariantViolation> {
    for (date, day) in index.iter() {
        if let Some(robot) = day.per_robot_counts.keys().find(|r| !robots.contains(r)) {
            return Err(InvariantViolation {
                date: Some(*date),
                msg: format!("robot {} missing from robot set", robot),
            });
        }
    }
    Ok(())
}

pub fn assert_all(index: &AggregateIndex, robots: &RobotSet) -> Result<(), InvariantViolation> {
    assert_histogram_consistency(index)?;
    assert_robot_membership(index, robots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::record::LogRecord;

    #[test]
    fn merged_index_is_consistent() {
        let d1 = DateKey::parse("2024-01-01").unwrap();
        let d2 = DateKey::parse("2024-01-02").unwrap();
        let mut agg = Aggregator::new();
        agg.merge_records(vec![
            LogRecord::new("A", "1", d1),
            LogRecord::new("B", "1", d1),
            LogRecord::new("B", "2", d1),
            LogRecord::new("A", "3", d2),
        ]);
        assert_eq!(assert_all(agg.index(), agg.robots()), Ok(()));
    }

    #[test]
    fn foreign_robot_set_is_reported() {
        let d1 = DateKey::parse("2024-01-01").unwrap();
        let mut agg = Aggregator::new();
        agg.merge_records(vec![LogRecord::new("A", "1", d1)]);
        let err = assert_robot_membership(agg.index(), &RobotSet::default()).unwrap_err();
        assert_eq!(err.date, Some(d1));
        assert!(err.to_string().contains("robot A"));
    }
}
