use serde::Serialize;
use serde_json::json;

use crate::aggregate::Histogram;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::query::DayView;
use crate::record::ErrorCode;

pub const DAY_PALETTE: [&str; 5] = ["#FF6384", "#36A2EB", "#FFCE56", "#4CAF50", "#FFC107"];
pub const ROBOT_PALETTE: [&str; 5] = ["#FF5733", "#33FF57", "#3357FF", "#FFC300", "#C70039"];

pub const NO_ROBOT_DATA: &str = "No data available for the selected robot";
pub const NO_ROBOT_SELECTED: &str = "No robot selected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#RRGGBB`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#')?;
        if s.len() != 6 {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();
        Some(Rgb(byte(0)?, byte(2)?, byte(4)?))
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Fixed colour list, reused from the start when slices outnumber colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn from_hex(colors: &[&str]) -> Self {
        Self {
            colors: colors.iter().filter_map(|c| Rgb::from_hex(c)).collect(),
        }
    }

    pub fn color(&self, i: usize) -> Rgb {
        if self.colors.is_empty() {
            return Rgb(128, 128, 128);
        }
        self.colors[i % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub code: ErrorCode,
    pub label: String,
    pub value: u64,
    /// Fraction of the chart total, 0.0..=1.0.
    pub share: f64,
    #[serde(serialize_with = "serialize_rgb_hex")]
    pub color: Rgb,
}

fn serialize_rgb_hex<S: serde::Serializer>(c: &Rgb, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&c.hex())
}

/// A share ("pie") chart built from one histogram. Slice order is the
/// histogram's order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareChart {
    pub id: u64,
    pub title: String,
    pub slices: Vec<Slice>,
    /// Set when the chart is an explicit empty state.
    pub empty_message: Option<String>,
}

impl ShareChart {
    pub fn from_histogram(id: u64, title: impl Into<String>, hist: &Histogram, palette: &Palette) -> Self {
        let total = hist.total();
        let slices = hist
            .entries()
            .enumerate()
            .map(|(i, (code, value))| Slice {
                code: code.clone(),
                label: code.label(),
                value,
                share: if total == 0 { 0.0 } else { value as f64 / total as f64 },
                color: palette.color(i),
            })
            .collect();
        Self {
            id,
            title: title.into(),
            slices,
            empty_message: None,
        }
    }

    pub fn empty(id: u64, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            slices: Vec::new(),
            empty_message: Some(message.into()),
        }
    }

    pub fn total(&self) -> u64 {
        self.slices.iter().map(|s| s.value).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Day,
    Robot,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelKind::Day => "day",
            PanelKind::Robot => "robot",
        }
    }
}

/// One chart region. Holds at most one live chart; showing a new one releases
/// the old one first.
#[derive(Debug, Clone)]
pub struct ChartPanel {
    kind: PanelKind,
    palette: Palette,
    current: Option<ShareChart>,
    generation: u64,
}

impl ChartPanel {
    pub fn new(kind: PanelKind, palette: Palette) -> Self {
        Self {
            kind,
            palette,
            current: None,
            generation: 0,
        }
    }

    pub fn day() -> Self {
        Self::new(PanelKind::Day, Palette::from_hex(&DAY_PALETTE))
    }

    pub fn robot() -> Self {
        Self::new(PanelKind::Robot, Palette::from_hex(&ROBOT_PALETTE))
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn current(&self) -> Option<&ShareChart> {
        self.current.as_ref()
    }

    /// Number of charts this panel has acquired so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn show(&mut self, title: impl Into<String>, hist: &Histogram) -> &ShareChart {
        self.release();
        let chart = ShareChart::from_histogram(self.next_id(), title, hist, &self.palette);
        self.acquire(chart)
    }

    pub fn show_empty(&mut self, title: impl Into<String>, message: impl Into<String>) -> &ShareChart {
        self.release();
        let chart = ShareChart::empty(self.next_id(), title, message);
        self.acquire(chart)
    }

    pub fn clear(&mut self) {
        self.release();
    }

    fn next_id(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn release(&mut self) {
        if let Some(old) = self.current.take() {
            log(
                Level::Trace,
                Domain::Render,
                "chart_released",
                obj(&[("panel", v_str(self.kind.as_str())), ("id", json!(old.id))]),
            );
        }
    }

    fn acquire(&mut self, chart: ShareChart) -> &ShareChart {
        log(
            Level::Trace,
            Domain::Render,
            "chart_acquired",
            obj(&[
                ("panel", v_str(self.kind.as_str())),
                ("id", json!(chart.id)),
                ("slices", json!(chart.slices.len())),
            ]),
        );
        self.current.insert(chart)
    }
}

/// The two chart regions: all robots for the day, and the selected robot.
#[derive(Debug, Clone)]
pub struct ChartBoard {
    pub day: ChartPanel,
    pub robot: ChartPanel,
}

impl Default for ChartBoard {
    fn default() -> Self {
        Self {
            day: ChartPanel::day(),
            robot: ChartPanel::robot(),
        }
    }
}

impl ChartBoard {
    pub fn show(&mut self, view: &DayView) {
        self.day.show(format!("All robots, {}", view.date), &view.total);
        match (&view.robot_id, &view.robot) {
            (Some(id), Some(hist)) => {
                self.robot.show(format!("Robot {}, {}", id, view.date), hist);
            }
            (Some(id), None) => {
                self.robot.show_empty(format!("Robot {}, {}", id, view.date), NO_ROBOT_DATA);
            }
            (None, _) => {
                self.robot.show_empty(view.date.to_string(), NO_ROBOT_SELECTED);
            }
        }
    }

    pub fn clear(&mut self) {
        self.day.clear();
        self.robot.clear();
    }

    pub fn is_visible(&self) -> bool {
        self.day.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DateKey;

    fn hist(pairs: &[(&str, u64)]) -> Histogram {
        pairs.iter().map(|(c, n)| (ErrorCode::from(*c), *n)).collect()
    }

    #[test]
    fn parses_palette_hex() {
        assert_eq!(Rgb::from_hex("#FF6384"), Some(Rgb(255, 99, 132)));
        assert_eq!(Rgb::from_hex("FF6384"), None);
        assert_eq!(Rgb::from_hex("#FF63"), None);
        assert_eq!(Rgb(255, 99, 132).hex(), "#FF6384");
        assert_eq!(Palette::from_hex(&DAY_PALETTE).len(), 5);
    }

    #[test]
    fn slices_follow_histogram_order_and_cycle_colours() {
        let h = hist(&[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 3)]);
        let palette = Palette::from_hex(&DAY_PALETTE);
        let chart = ShareChart::from_histogram(1, "t", &h, &palette);
        let labels: Vec<_> = chart.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Error a", "Error b", "Error c", "Error d", "Error e", "Error f"]);
        assert_eq!(chart.slices[5].color, chart.slices[0].color);
        assert!((chart.slices[5].share - 0.375).abs() < 1e-9);
        assert_eq!(chart.total(), 8);
    }

    #[test]
    fn panel_releases_before_acquiring() {
        let mut panel = ChartPanel::day();
        assert!(panel.current().is_none());
        panel.show("one", &hist(&[("E1", 2)]));
        panel.show("two", &hist(&[("E2", 1)]));
        assert_eq!(panel.generation(), 2);
        let current = panel.current().unwrap();
        assert_eq!(current.id, 2);
        assert_eq!(current.title, "two");
        panel.clear();
        assert!(panel.current().is_none());
        assert_eq!(panel.generation(), 2);
    }

    #[test]
    fn board_renders_explicit_empty_robot_state() {
        let view = DayView {
            date: DateKey::parse("2024-03-05").unwrap(),
            total: hist(&[("E1", 2)]),
            robot_id: Some("R3".to_string()),
            robot: None,
        };
        let mut board = ChartBoard::default();
        board.show(&view);
        assert!(board.is_visible());
        let robot = board.robot.current().unwrap();
        assert!(robot.is_empty());
        assert_eq!(robot.empty_message.as_deref(), Some(NO_ROBOT_DATA));

        let view = DayView { robot_id: None, ..view };
        board.show(&view);
        assert_eq!(
            board.robot.current().unwrap().empty_message.as_deref(),
            Some(NO_ROBOT_SELECTED)
        );
        assert_eq!(board.robot.generation(), 2);
    }
}
