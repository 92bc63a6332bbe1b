use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use robolog::config::Config;
use robolog::ingest;
use robolog::logging::{self, log, obj, v_str, Domain, Level, ProfileScope, Sink};
use robolog::record::DateKey;
use robolog::render::{text, ChartBoard, Notice};
use robolog::service::ErrorCalendar;
use robolog::state::AppState;
use robolog::verify;

#[derive(Parser, Debug)]
#[command(name = "robolog", version, about = "Aggregate robot error logs into a calendar of per-day error histograms")]
struct Cli {
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingestion reports, robots, date range and per-day totals.
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Check index consistency and fail on any violation.
        #[arg(long)]
        verify: bool,
    },
    /// Month grids with days that have data flagged.
    Calendar {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        year: i32,
        /// 1-12; omit for the whole year.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Both charts for one day.
    Day {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Robot for the second chart; defaults to the first robot seen.
        #[arg(long)]
        robot: Option<String>,
    },
    /// Interactive calendar.
    Tui {
        files: Vec<PathBuf>,
        #[arg(long, env = "ROBOLOG_YEAR")]
        year: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let sink = match cli.command {
        Command::Tui { .. } => Sink::from_env_or(Sink::Off),
        _ => Sink::from_env_or(Sink::Stderr),
    };
    logging::init(sink);
    log(Level::Info, Domain::System, "start", obj(&[("run_id", v_str(logging::run_id()))]));

    match cli.command {
        Command::Summary { files, verify } => {
            let (cal, notices) = load_all(&files).await;
            summary(&cal, &notices, verify, cli.json)
        }
        Command::Calendar { files, year, month } => {
            let (cal, notices) = load_all(&files).await;
            calendar(&cal, &notices, year, month, cli.json)
        }
        Command::Day { files, date, robot } => {
            let (mut cal, notices) = load_all(&files).await;
            day(&mut cal, &notices, &date, robot.as_deref(), cli.json)
        }
        Command::Tui { files, year } => {
            let mut config = Config::from_env();
            if let Some(y) = year {
                config.year = y;
                config.normalize();
            }
            let (cal, notices) = load_all(&files).await;
            let mut state = AppState::new(cal, config);
            for n in notices.into_iter().rev() {
                state.push_notice(n);
            }
            robolog::app::run(state).await.map(|_| ())
        }
    }
}

/// Each file is its own ingestion attempt; failures become notices and the
/// remaining files still merge.
async fn load_all(files: &[PathBuf]) -> (ErrorCalendar, Vec<Notice>) {
    let _p = ProfileScope::with_context("main", "load_all", &[("files", json!(files.len()))]);
    let mut cal = ErrorCalendar::new();
    let mut notices = Vec::with_capacity(files.len());
    for path in files {
        let source = path.display().to_string();
        let outcome = match ingest::read_source(path).await {
            Ok(doc) => cal.ingest_document(&doc),
            Err(err) => Err(err),
        };
        let notice = match outcome {
            Ok(report) => Notice::loaded(&report),
            Err(err) => Notice::ingest_failed(&source, &err),
        };
        notices.push(notice);
    }
    (cal, notices)
}

fn print_notices(notices: &[Notice]) {
    for n in notices {
        eprintln!("{}", n.text());
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{}", out);
    Ok(())
}

fn summary(cal: &ErrorCalendar, notices: &[Notice], check: bool, as_json: bool) -> Result<()> {
    let violation = if check {
        verify::assert_all(cal.index(), cal.robots()).err()
    } else {
        None
    };

    if as_json {
        let range = cal.date_range().map(|(a, b)| json!({"first": a, "last": b}));
        print_json(&json!({
            "ingestions": cal.history(),
            "notices": notices,
            "robots": cal.robots(),
            "selected_robot": cal.selected_robot(),
            "records": cal.record_count(),
            "date_range": range,
            "index": cal.index(),
            "verified": check.then(|| violation.is_none()),
        }))?;
    } else {
        print_notices(notices);
        let robots: Vec<&str> = cal.robots().iter().collect();
        println!("robots: {}", if robots.is_empty() { "-".to_string() } else { robots.join(", ") });
        match cal.date_range() {
            Some((first, last)) => println!(
                "days: {} ({} .. {}), records: {}",
                cal.index().len(),
                first,
                last,
                cal.record_count()
            ),
            None => println!("days: 0"),
        }
        for (date, day) in cal.index().iter() {
            let codes: Vec<String> = day
                .total_counts
                .entries()
                .map(|(code, n)| format!("{}:{}", code, n))
                .collect();
            println!("{}  {:>5}  {}", date, day.record_count(), codes.join(" "));
        }
        if check && violation.is_none() {
            println!("verify: ok");
        }
    }

    if let Some(v) = violation {
        bail!("verify failed: {}", v);
    }
    Ok(())
}

fn calendar(cal: &ErrorCalendar, notices: &[Notice], year: i32, month: Option<u32>, as_json: bool) -> Result<()> {
    let layouts = cal
        .layouts(year, month.map(|m| m - 1))
        .with_context(|| format!("calendar for {}", year))?;
    if as_json {
        print_json(&json!({ "notices": notices, "months": layouts }))
    } else {
        print_notices(notices);
        print!("{}", text::render_calendar(&layouts));
        Ok(())
    }
}

fn day(cal: &mut ErrorCalendar, notices: &[Notice], date: &str, robot: Option<&str>, as_json: bool) -> Result<()> {
    let key = DateKey::parse(date).ok_or_else(|| anyhow!("invalid date {:?}, expected YYYY-MM-DD", date))?;
    if let Some(r) = robot {
        cal.select_robot(r).with_context(|| format!("select robot {}", r))?;
    }

    let Some(view) = cal.query_selected(key) else {
        let notice = Notice::NoDataForDate { date: key };
        log(Level::Info, Domain::Query, "no_data", obj(&[("date", v_str(&key.to_string()))]));
        if as_json {
            return print_json(&json!({ "notices": notices, "day": null, "notice": notice }));
        }
        print_notices(notices);
        println!("{}", notice.text());
        return Ok(());
    };

    let mut board = ChartBoard::default();
    board.show(&view);
    if as_json {
        print_json(&json!({
            "notices": notices,
            "day": view,
            "charts": [board.day.current(), board.robot.current()],
        }))
    } else {
        print_notices(notices);
        if let Some(chart) = board.day.current() {
            print!("{}", text::render_chart(chart));
        }
        println!();
        if let Some(chart) = board.robot.current() {
            print!("{}", text::render_chart(chart));
        }
        Ok(())
    }
}
