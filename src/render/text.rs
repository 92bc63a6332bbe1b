//! Plain-text rendering for the CLI: month grids and chart legends.

use std::fmt::Write as _;

use crate::calendar::{MonthLayout, WEEKDAY_INITIALS};
use crate::render::chart::ShareChart;

const BAR_WIDTH: usize = 24;

/// One month as a 7-column grid. Days with data are marked `*`; the selected
/// day is bracketed.
pub fn render_month(layout: &MonthLayout, selected: Option<u32>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:^28}", layout.title());
    for d in WEEKDAY_INITIALS {
        let _ = write!(out, "  {} ", d);
    }
    out.push('\n');
    for week in layout.weeks() {
        for cell in week {
            match cell {
                None => out.push_str("    "),
                Some(day) => {
                    let mark = if layout.is_flagged(day) { '*' } else { ' ' };
                    if selected == Some(day) {
                        let _ = write!(out, "[{:>2}]", day);
                    } else {
                        let _ = write!(out, " {:>2}{}", day, mark);
                    }
                }
            }
        }
        out.truncate(out.trim_end_matches(' ').len());
        out.push('\n');
    }
    out
}

pub fn render_calendar(layouts: &[MonthLayout]) -> String {
    layouts
        .iter()
        .map(|l| render_month(l, None))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Legend with counts, shares and a proportional bar per slice.
pub fn render_chart(chart: &ShareChart) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", chart.title);
    if let Some(msg) = &chart.empty_message {
        let _ = writeln!(out, "  ({})", msg);
        return out;
    }
    let label_width = chart.slices.iter().map(|s| s.label.len()).max().unwrap_or(0);
    for s in &chart.slices {
        let filled = (s.share * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "  {:<w$}  {:>6}  {:>5.1}%  {}  {}",
            s.label,
            s.value,
            s.share * 100.0,
            s.color.hex(),
            "#".repeat(filled.max(1)),
            w = label_width
        );
    }
    let _ = writeln!(out, "  {:<w$}  {:>6}", "Total", chart.total(), w = label_width);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, Histogram};
    use crate::record::{DateKey, ErrorCode, LogRecord};
    use crate::render::chart::{Palette, DAY_PALETTE};

    #[test]
    fn month_grid_marks_flagged_days() {
        let mut agg = Aggregator::new();
        agg.merge_records(vec![LogRecord::new("R1", "E1", DateKey::parse("2024-02-29").unwrap())]);
        let layout = MonthLayout::build(agg.index(), 2024, 1).unwrap();
        let text = render_month(&layout, None);
        assert!(text.contains("February 2024"));
        assert!(text.contains(" 29*"));
        assert!(text.contains(" 28 "));
        assert!(!text.contains(" 30"));

        let selected = render_month(&layout, Some(29));
        assert!(selected.contains("[29]"));
    }

    #[test]
    fn chart_legend_lists_slices_in_order() {
        let h: Histogram = [(ErrorCode::from("E2"), 1), (ErrorCode::from("E1"), 3)]
            .into_iter()
            .collect();
        let chart = ShareChart::from_histogram(1, "All robots", &h, &Palette::from_hex(&DAY_PALETTE));
        let text = render_chart(&chart);
        let e2 = text.find("Error E2").unwrap();
        let e1 = text.find("Error E1").unwrap();
        assert!(e2 < e1);
        assert!(text.contains("75.0%"));
        assert!(text.contains("#FF6384"));
    }

    #[test]
    fn empty_chart_shows_message() {
        let chart = ShareChart::empty(1, "Robot R1", "No data available for the selected robot");
        assert!(render_chart(&chart).contains("(No data available for the selected robot)"));
    }
}
