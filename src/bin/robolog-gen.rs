//! Sample robot error logs for trying out the calendar.
//!
//! Usage:
//!   robolog-gen --robots 3 --days 30 --records 500 --seed 7 --start 2024-03-01 > sample.json
//!   robolog-gen --malformed 0.05 ...   # sprinkle in records the aggregator must skip

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};

const CODES: [&str; 8] = ["E101", "E102", "E203", "E204", "E310", "E404", "E500", "W17"];

#[derive(Parser, Debug)]
#[command(name = "robolog-gen", about = "Write a sample robot error log as a JSON array")]
struct Args {
    #[arg(long, default_value_t = 3)]
    robots: usize,
    #[arg(long, default_value_t = 30)]
    days: u32,
    #[arg(long, default_value_t = 200)]
    records: usize,
    #[arg(long, env = "SEED", default_value_t = 42)]
    seed: u64,
    /// YYYY-MM-DD
    #[arg(long, default_value = "2024-01-01")]
    start: String,
    /// Fraction of records that are deliberately malformed.
    #[arg(long, default_value_t = 0.0)]
    malformed: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = NaiveDate::parse_from_str(&args.start, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid --start {:?}: {}", args.start, e))?;
    let robots = args.robots.max(1);
    let days = args.days.max(1);
    let malformed = args.malformed.clamp(0.0, 1.0);

    let mut rng = StdRng::seed_from_u64(args.seed);
    // Each robot leans on a few codes so the charts differ per robot.
    let favourites: Vec<[usize; 3]> = (0..robots)
        .map(|_| {
            [
                rng.gen_range(0..CODES.len()),
                rng.gen_range(0..CODES.len()),
                rng.gen_range(0..CODES.len()),
            ]
        })
        .collect();

    let mut out = Vec::with_capacity(args.records);
    for _ in 0..args.records {
        let robot = rng.gen_range(0..robots);
        let code = if rng.gen_bool(0.8) {
            CODES[favourites[robot][rng.gen_range(0..3)]]
        } else {
            CODES[rng.gen_range(0..CODES.len())]
        };
        let date = start + Duration::days(rng.gen_range(0..days) as i64);
        let secs = rng.gen_range(0..86_400u32);
        let ts = date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN));

        let mut rec = json!({
            "robotId": format!("R{}", robot + 1),
            "errorCode": code,
            "lastModifiedDate": date_value(&mut rng, ts),
        });
        if malformed > 0.0 && rng.gen_bool(malformed) {
            corrupt(&mut rng, &mut rec);
        }
        out.push(rec);
    }

    println!("{}", serde_json::to_string_pretty(&Value::Array(out))?);
    Ok(())
}

/// Mostly ISO strings, with the Extended JSON number forms mixed in.
fn date_value(rng: &mut StdRng, ts: chrono::NaiveDateTime) -> Value {
    let millis = ts.and_utc().timestamp_millis();
    match rng.gen_range(0..10) {
        0 => json!({ "$date": millis }),
        1 => json!({ "$date": { "$numberLong": millis.to_string() } }),
        _ => json!({ "$date": ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string() }),
    }
}

fn corrupt(rng: &mut StdRng, rec: &mut Value) {
    let kind = rng.gen_range(0..5);
    if kind == 4 {
        *rec = json!("garbage");
        return;
    }
    let Some(map) = rec.as_object_mut() else {
        return;
    };
    match kind {
        0 => {
            map.remove("robotId");
        }
        1 => {
            map.remove("errorCode");
        }
        2 => {
            map.insert("lastModifiedDate".into(), json!({ "$date": "not-a-date" }));
        }
        _ => {
            map.insert("robotId".into(), json!(["R1"]));
        }
    }
}
