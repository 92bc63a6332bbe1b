use anyhow::Result;
use chrono::Datelike;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::io::{stdout, Stdout};

use crate::calendar::{MonthLayout, WEEKDAY_INITIALS};
use crate::render::chart::{ChartPanel, Rgb};
use crate::render::{Notice, Severity};
use crate::state::{AppState, InputMode};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> Result<Tui> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub fn ui(f: &mut Frame, state: &AppState) {
    let prompt_height = if state.input_mode == InputMode::Editing { 3 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(prompt_height),
        ])
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[1]);

    render_selectors(f, rows[0], state);
    render_calendar(f, body[0], state);
    render_charts(f, body[1], state);
    render_notices(f, rows[2], state);
    if state.input_mode == InputMode::Editing {
        render_prompt(f, rows[3], state);
    }
}

fn render_selectors(f: &mut Frame, area: Rect, state: &AppState) {
    let month = match state.month {
        Some(m) => crate::calendar::MONTH_NAMES[m as usize].to_string(),
        None => "All months".to_string(),
    };
    let robot = state.calendar.selected_robot().unwrap_or("-");
    let robots = state.calendar.robots().len();
    let mut spans = vec![
        Span::styled(" Year ", Style::default().fg(Color::DarkGray)),
        Span::styled(state.year.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  Month ", Style::default().fg(Color::DarkGray)),
        Span::styled(month, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  Robot ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ({} known)", robot, robots), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(src) = &state.loading {
        spans.push(Span::styled(format!("  loading {}…", src), Style::default().fg(Color::Yellow)));
    }
    let help = "  y/Y year  m/M month  r/R robot  arrows move  n/p next/prev  enter select  o open  q quit";
    spans.push(Span::styled(help, Style::default().fg(Color::DarkGray)));

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Robot Error Calendar")
        .border_style(Style::default().fg(Color::Yellow));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_calendar(f: &mut Frame, area: Rect, state: &AppState) {
    let layouts = match state.calendar.layouts(state.year, state.month) {
        Ok(l) => l,
        Err(err) => {
            f.render_widget(Paragraph::new(err.to_string()), area);
            return;
        }
    };

    if layouts.len() == 1 {
        render_month(f, area, &layouts[0], state);
        return;
    }

    let month_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for (r, row_area) in month_rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(*row_area);
        for (c, cell) in cols.iter().enumerate() {
            if let Some(layout) = layouts.get(r * 3 + c) {
                render_month(f, *cell, layout, state);
            }
        }
    }
}

fn render_month(f: &mut Frame, area: Rect, layout: &MonthLayout, state: &AppState) {
    let cursor_here = state.cursor.year() == layout.year && state.cursor.month0() == layout.month;
    let selected = state
        .selected_day
        .filter(|d| d.year() == layout.year && d.month0() == layout.month)
        .map(|d| d.day());

    let mut lines = vec![Line::from(
        WEEKDAY_INITIALS
            .iter()
            .map(|d| Span::styled(format!(" {} ", d), Style::default().fg(Color::DarkGray)))
            .collect::<Vec<_>>(),
    )];
    for week in layout.weeks() {
        let spans: Vec<Span> = week
            .iter()
            .map(|cell| match cell {
                None => Span::raw("   "),
                Some(day) => {
                    let mut style = Style::default();
                    if layout.is_flagged(*day) {
                        style = style.fg(Color::Black).bg(Color::Red);
                    }
                    if selected == Some(*day) {
                        style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
                    }
                    if cursor_here && state.cursor.day() == *day {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!("{:>2} ", day), style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let border = if cursor_here { Color::Cyan } else { Color::Blue };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(layout.title())
        .border_style(Style::default().fg(border));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_charts(f: &mut Frame, area: Rect, state: &AppState) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let placeholder = match state.selected_day {
        Some(d) => d.to_string(),
        None => "Select a day with data".to_string(),
    };
    render_panel(f, halves[0], &state.charts.day, "Errors (all robots)", &placeholder);
    render_panel(f, halves[1], &state.charts.robot, "Errors (selected robot)", &placeholder);
}

fn render_panel(f: &mut Frame, area: Rect, panel: &ChartPanel, fallback_title: &str, placeholder: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let Some(chart) = panel.current() else {
        let p = Paragraph::new(placeholder.to_string())
            .style(Style::default().fg(Color::DarkGray))
            .block(block.title(fallback_title.to_string()));
        f.render_widget(p, area);
        return;
    };

    let block = block.title(chart.title.clone());
    if let Some(msg) = &chart.empty_message {
        let p = Paragraph::new(msg.clone())
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    // Stacked share bar across the panel width, then the legend.
    let width = area.width.saturating_sub(2) as usize;
    let mut bar = Vec::new();
    let mut used = 0usize;
    for (i, s) in chart.slices.iter().enumerate() {
        let cells = if i + 1 == chart.slices.len() {
            width.saturating_sub(used)
        } else {
            ((s.share * width as f64).round() as usize).min(width.saturating_sub(used))
        };
        used += cells;
        bar.push(Span::styled("█".repeat(cells), Style::default().fg(color(s.color))));
    }

    let mut lines = vec![Line::from(bar), Line::raw("")];
    for s in &chart.slices {
        lines.push(Line::from(vec![
            Span::styled("■ ", Style::default().fg(color(s.color))),
            Span::raw(format!("{:<14}", s.label)),
            Span::raw(format!("{:>6}", s.value)),
            Span::styled(format!("{:>7.1}%", s.share * 100.0), Style::default().fg(Color::DarkGray)),
        ]));
    }
    lines.push(Line::raw(format!("  {:<14}{:>6}", "Total", chart.total())));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_notices(f: &mut Frame, area: Rect, state: &AppState) {
    let lines: Vec<Line> = state
        .notices
        .iter()
        .map(|n: &Notice| {
            let style = match n.severity() {
                Severity::Info => Style::default().fg(Color::Green),
                Severity::Warn => Style::default().fg(Color::Yellow),
                Severity::Error => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(n.text(), style))
        })
        .collect();
    let summary = match state.calendar.date_range() {
        Some((first, last)) => format!(
            "Notifications ({} records, {} days, {} .. {})",
            state.calendar.record_count(),
            state.calendar.index().len(),
            first,
            last
        ),
        None => "Notifications (no data loaded, press o to open a file)".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(summary)
        .border_style(Style::default().fg(Color::Green));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), area);
}

fn render_prompt(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Open JSON file (enter to load, esc to cancel)")
        .border_style(Style::default().fg(Color::Yellow));
    let text = format!("{}_", state.editing_text);
    f.render_widget(Paragraph::new(text).block(block), area);
}
