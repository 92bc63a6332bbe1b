use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::Config;
use crate::error::IngestError;
use crate::ingest::{self, IngestReport};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::record::DateKey;
use crate::render::{ChartBoard, Notice};
use crate::service::ErrorCalendar;

/// Notifications kept on screen.
const MAX_NOTICES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Everything the terminal UI shows, plus the session's aggregation state.
#[derive(Debug)]
pub struct AppState {
    pub calendar: ErrorCalendar,
    pub config: Config,
    pub year: i32,
    /// 0-based; `None` shows the whole year.
    pub month: Option<u32>,
    pub cursor: NaiveDate,
    pub selected_day: Option<DateKey>,
    pub charts: ChartBoard,
    pub notices: VecDeque<Notice>,
    pub input_mode: InputMode,
    pub editing_text: String,
    /// Source currently being read, if any.
    pub loading: Option<String>,
}

impl AppState {
    pub fn new(calendar: ErrorCalendar, config: Config) -> Self {
        let year = config.clamp_year(config.year);
        let cursor = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        Self {
            calendar,
            config,
            year,
            month: None,
            cursor,
            selected_day: None,
            charts: ChartBoard::default(),
            notices: VecDeque::with_capacity(MAX_NOTICES),
            input_mode: InputMode::Normal,
            editing_text: String::new(),
            loading: None,
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        log(
            Level::Info,
            Domain::Ui,
            "notice",
            obj(&[("text", v_str(&notice.text()))]),
        );
        self.notices.push_front(notice);
        self.notices.truncate(MAX_NOTICES);
    }

    // -------------------------------------------------------------------------
    // Calendar navigation
    // -------------------------------------------------------------------------

    fn in_view(&self, date: NaiveDate) -> bool {
        date.year() == self.year && self.month.map_or(true, |m| date.month0() == m)
    }

    /// Moves the cursor by `days`, staying inside the displayed month or year.
    pub fn move_cursor(&mut self, days: i64) {
        if let Some(next) = self.cursor.checked_add_signed(Duration::days(days)) {
            if self.in_view(next) {
                self.cursor = next;
            }
        }
    }

    /// Jumps to the next (or previous) day with data inside the view.
    pub fn jump_flagged(&mut self, forward: bool) {
        let current = DateKey::new(self.cursor);
        let candidate = if forward {
            self.calendar.day_keys().find(|k| **k > current && self.in_view(k.date())).copied()
        } else {
            self.calendar
                .day_keys()
                .filter(|k| **k < current && self.in_view(k.date()))
                .last()
                .copied()
        };
        if let Some(k) = candidate {
            self.cursor = k.date();
        }
    }

    pub fn change_year(&mut self, delta: i32) {
        let year = self.config.clamp_year(self.year.saturating_add(delta));
        if year == self.year {
            return;
        }
        self.year = year;
        self.cursor = same_day_in_year(self.cursor, year);
        log(Level::Debug, Domain::Calendar, "year", obj(&[("year", serde_json::json!(year))]));
    }

    /// Steps the month selector through "all months", January .. December.
    pub fn cycle_month(&mut self, step: i32) {
        // 0 = all months, 1..=12 = January..December
        let pos = self.month.map_or(0, |m| m as i32 + 1);
        let next = (pos + step).rem_euclid(13);
        self.month = if next == 0 { None } else { Some(next as u32 - 1) };
        if let Some(m) = self.month {
            if self.cursor.month0() != m {
                self.cursor = NaiveDate::from_ymd_opt(self.year, m + 1, 1).unwrap_or(self.cursor);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Day selection and robots
    // -------------------------------------------------------------------------

    /// Selects the day under the cursor and redraws both chart panels, or
    /// raises a notice when the day has no data.
    pub fn select_cursor_day(&mut self) {
        let date = DateKey::new(self.cursor);
        match self.calendar.query_selected(date) {
            Some(view) => {
                self.selected_day = Some(date);
                self.charts.show(&view);
            }
            None => {
                self.selected_day = None;
                self.charts.clear();
                self.push_notice(Notice::NoDataForDate { date });
            }
        }
    }

    fn refresh_charts(&mut self) {
        if let Some(date) = self.selected_day {
            if let Some(view) = self.calendar.query_selected(date) {
                self.charts.show(&view);
            }
        }
    }

    pub fn cycle_robot(&mut self, step: isize) {
        self.calendar.cycle_robot(step);
        self.refresh_charts();
    }

    pub fn clear_day(&mut self) {
        self.selected_day = None;
        self.charts.clear();
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    pub fn start_editing(&mut self) {
        self.editing_text.clear();
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_editing(&mut self) {
        self.editing_text.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Closes the prompt and returns the path to read, unless a read is
    /// already running or nothing was typed.
    pub fn submit_editing(&mut self) -> Option<PathBuf> {
        let text = std::mem::take(&mut self.editing_text);
        self.input_mode = InputMode::Normal;
        if text.trim().is_empty() {
            return None;
        }
        if self.loading.is_some() {
            self.push_notice(Notice::LoadInProgress);
            return None;
        }
        let path = ingest::resolve_input_path(&text);
        self.loading = Some(path.display().to_string());
        Some(path)
    }

    /// Applies the outcome of a finished read.
    pub fn finish_load(
        &mut self,
        source: &str,
        result: Result<ingest::SourceDocument, IngestError>,
    ) -> Option<IngestReport> {
        self.loading = None;
        let outcome = result.and_then(|doc| self.calendar.ingest_document(&doc));
        match outcome {
            Ok(report) => {
                self.push_notice(Notice::loaded(&report));
                self.refresh_charts();
                Some(report)
            }
            Err(err) => {
                self.push_notice(Notice::ingest_failed(source, &err));
                None
            }
        }
    }
}

fn same_day_in_year(date: NaiveDate, year: i32) -> NaiveDate {
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}
