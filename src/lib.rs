//! Robot error-log aggregation: per-day histograms of error codes, a calendar
//! of days with data, day lookups and the chart panels that present them.

pub mod aggregate;
pub mod app;
pub mod calendar;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod query;
pub mod record;
pub mod render;
pub mod service;
pub mod state;
pub mod tui;
pub mod verify;

pub use aggregate::{AggregateIndex, Aggregator, DayAggregate, Histogram, MergeReport, RobotSet};
pub use record::{DateKey, ErrorCode, LogRecord, RawRecord};
pub use service::ErrorCalendar;
