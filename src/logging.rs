//! Structured logging.
//!
//! Every record is one JSON line carrying a run id, a sequence number, a level
//! and a domain, plus free-form `data` fields. Records go to stderr by default,
//! to `LOG_FILE` when set, or nowhere. The terminal UI routes them away from
//! stderr so they never land on the screen.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Level::Warn)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Ingest,    // File reads, document parsing
    Aggregate, // Merges, skipped records
    Calendar,  // Month layouts
    Query,     // Day lookups
    Render,    // Chart panels, text output
    Ui,        // Terminal UI events
    System,    // Startup, shutdown
    Profile,   // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ingest => "ingest",
            Domain::Aggregate => "aggregate",
            Domain::Calendar => "calendar",
            Domain::Query => "query",
            Domain::Render => "render",
            Domain::Ui => "ui",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    fn enabled_in(&self, filter: Option<&str>) -> bool {
        match filter {
            None | Some("all") => true,
            Some(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stderr,
    File(PathBuf),
    Off,
}

impl Sink {
    /// `LOG_FILE` if set, otherwise the given fallback.
    pub fn from_env_or(fallback: Sink) -> Self {
        match std::env::var("LOG_FILE") {
            Ok(path) if !path.trim().is_empty() => Sink::File(PathBuf::from(path)),
            _ => fallback,
        }
    }
}

enum Writer {
    Stderr,
    File(Mutex<LineWriter<File>>),
    Off,
}

struct RunContext {
    run_id: String,
    min_level: Level,
    domains: Option<String>,
    writer: Writer,
}

impl RunContext {
    fn new(sink: Sink) -> Self {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let writer = match sink {
            Sink::Stderr => Writer::Stderr,
            Sink::Off => Writer::Off,
            Sink::File(path) => match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(f) => Writer::File(Mutex::new(LineWriter::new(f))),
                Err(err) => {
                    eprintln!("[log] failed to open {}: {}", path.display(), err);
                    Writer::Off
                }
            },
        };
        Self {
            run_id,
            min_level: Level::from_env(),
            domains: std::env::var("LOG_DOMAINS").ok(),
            writer,
        }
    }
}

/// Installs the sink. Only the first call has an effect; logging before any
/// call uses `Sink::from_env_or(Sink::Stderr)`.
pub fn init(sink: Sink) -> bool {
    let mut installed = false;
    RUN_CONTEXT.get_or_init(|| {
        installed = true;
        RunContext::new(sink)
    });
    installed
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| RunContext::new(Sink::from_env_or(Sink::Stderr)))
}

pub fn run_id() -> &'static str {
    &ensure_run_context().run_id
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    if level < ctx.min_level || !domain.enabled_in(ctx.domains.as_deref()) {
        return;
    }
    if matches!(ctx.writer, Writer::Off) {
        return;
    }
    emit_record(ctx, level, domain, event, fields);
}

fn emit_record(
    ctx: &RunContext,
    level: Level,
    domain: Domain,
    event: &str,
    mut fields: Map<String, Value>,
) {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    match &ctx.writer {
        Writer::Stderr => eprintln!("{}", line),
        Writer::File(w) => {
            if let Ok(mut w) = w.lock() {
                let _ = writeln!(w, "{}", line);
            }
        }
        Writer::Off => {}
    }
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    module: &'static str,
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn new(module: &'static str, label: &'static str) -> Self {
        Self {
            module,
            label,
            context: None,
            started: Instant::now(),
            enabled: Self::should_sample(),
        }
    }

    pub fn with_context(
        module: &'static str,
        label: &'static str,
        fields: &[(&str, Value)],
    ) -> Self {
        let enabled = Self::should_sample();
        Self {
            module,
            label,
            context: if enabled { Some(obj(fields)) } else { None },
            started: Instant::now(),
            enabled,
        }
    }

    fn should_sample() -> bool {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|p| {
                if p >= 1.0 {
                    true
                } else if p <= 0.0 {
                    false
                } else {
                    let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
                    let bucket = (seq % 10_000) as f64 / 10_000.0;
                    bucket < p
                }
            })
            .unwrap_or(true)
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("module".to_string(), v_str(self.module));
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse(" warn "), Some(Level::Warn));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_domain_filter() {
        assert!(Domain::Ingest.enabled_in(None));
        assert!(Domain::Ingest.enabled_in(Some("all")));
        assert!(Domain::Ingest.enabled_in(Some("query, ingest")));
        assert!(!Domain::Render.enabled_in(Some("query,ingest")));
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_profile_scope_keeps_context() {
        let scope = ProfileScope::with_context("ingest", "load", &[("files", json!(3))]);
        if scope.enabled {
            let ctx = scope.context.as_ref().unwrap();
            assert_eq!(ctx.get("files").unwrap(), 3);
        } else {
            assert!(scope.context.is_none());
        }
    }
}
