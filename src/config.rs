use chrono::Datelike;

/// Years the calendar can show.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Year the calendar opens on.
    pub year: i32,
    /// Inclusive bounds of the year selector.
    pub year_min: i32,
    pub year_max: i32,
    /// Redraw interval of the terminal UI.
    pub tick_ms: u64,
    pub log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let year = std::env::var("ROBOLOG_YEAR")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or_else(current_year)
            .clamp(MIN_YEAR, MAX_YEAR);
        let mut cfg = Self {
            year,
            year_min: std::env::var("ROBOLOG_YEAR_MIN").ok().and_then(|v| v.parse().ok()).unwrap_or(year.saturating_sub(10)),
            year_max: std::env::var("ROBOLOG_YEAR_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(year.saturating_add(1)),
            tick_ms: std::env::var("ROBOLOG_TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            log_file: std::env::var("LOG_FILE").ok().filter(|v| !v.trim().is_empty()),
        };
        cfg.normalize();
        cfg
    }

    /// Keeps `MIN_YEAR <= year_min <= year <= year_max <= MAX_YEAR` and a
    /// non-zero tick.
    pub fn normalize(&mut self) {
        self.year = self.year.clamp(MIN_YEAR, MAX_YEAR);
        if self.year_min > self.year_max {
            std::mem::swap(&mut self.year_min, &mut self.year_max);
        }
        self.year_min = self.year_min.min(self.year);
        self.year_max = self.year_max.max(self.year);
        self.year_min = self.year_min.clamp(MIN_YEAR, MAX_YEAR);
        self.year_max = self.year_max.clamp(MIN_YEAR, MAX_YEAR);
        self.tick_ms = self.tick_ms.max(10);
    }

    pub fn clamp_year(&self, year: i32) -> i32 {
        year.clamp(self.year_min, self.year_max)
    }
}

impl Default for Config {
    fn default() -> Self {
        let year = current_year();
        Self {
            year,
            year_min: year - 10,
            year_max: year + 1,
            tick_ms: 100,
            log_file: None,
        }
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_widens_bounds_to_include_year() {
        let mut cfg = Config {
            year: 2030,
            year_min: 2025,
            year_max: 2020,
            tick_ms: 0,
            log_file: None,
        };
        cfg.normalize();
        assert_eq!((cfg.year_min, cfg.year_max), (2020, 2030));
        assert_eq!(cfg.tick_ms, 10);
        assert_eq!(cfg.clamp_year(1999), 2020);
        assert_eq!(cfg.clamp_year(2024), 2024);
    }

    #[test]
    fn extreme_years_are_clamped() {
        let mut cfg = Config {
            year: i32::MAX,
            year_min: i32::MAX.saturating_sub(10),
            year_max: i32::MAX.saturating_add(1),
            tick_ms: 100,
            log_file: None,
        };
        cfg.normalize();
        assert_eq!(cfg.year, MAX_YEAR);
        assert_eq!(cfg.year_max, MAX_YEAR);
        assert!(cfg.year_min <= cfg.year);
        assert_eq!(cfg.clamp_year(cfg.year.saturating_add(1)), MAX_YEAR);
    }
}
