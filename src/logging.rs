//! Structured logging for the dashboard client.
//!
//! Every record is a single JSON line on stderr so that stdout stays free for
//! the rendered dashboard. When `LOG_DIR` is set the same lines are appended to
//! `<LOG_DIR>/<run_id>/events.jsonl`.
//!
//! Credentials never reach a record: `sanitize_fields` redacts the admin key
//! header and its aliases before anything is written.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
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
}

impl Level {
    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Level::Warn)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
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
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Api,       // Outbound requests and responses
    Auth,      // Admin session and credential storage
    Analytics, // Aggregation runs
    Audit,     // Audit log summaries
    Vote,      // Comparison workspace
    System,    // Startup, config
    Profile,   // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Api => "api",
            Domain::Auth => "auth",
            Domain::Analytics => "analytics",
            Domain::Audit => "audit",
            Domain::Vote => "vote",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static LEVEL_OVERRIDE: OnceLock<Level> = OnceLock::new();
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut run_dir = PathBuf::from(base);
            run_dir.push(&run_id);
            if let Err(err) = create_dir_all(&run_dir) {
                eprintln!("[log] failed to create run dir: {}", err);
                return None;
            }
            match File::create(run_dir.join("events.jsonl")) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to create events log: {}", err);
                    None
                }
            }
        });
        RunContext { run_id, events }
    })
}

/// Pin the minimum level for the rest of the process (CLI `--log-level`).
/// Only the first call wins.
pub fn set_min_level(level: Level) {
    let _ = LEVEL_OVERRIDE.set(level);
}

fn min_level() -> Level {
    LEVEL_OVERRIDE.get().copied().unwrap_or_else(Level::from_env)
}

pub(crate) fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    let sensitive: Vec<String> = fields
        .keys()
        .filter(|k| {
            matches!(
                k.to_ascii_lowercase().as_str(),
                "x-admin-key" | "admin_key" | "adminkey" | "authorization"
            )
        })
        .cloned()
        .collect();
    for key in sensitive {
        fields.insert(key, redacted.clone());
    }
    fields
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < min_level() || !domain.is_enabled() {
        return;
    }
    let ctx = ensure_run_context();
    let mut data = sanitize_fields(fields);

    let msg = data.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    if let Some(events) = &ctx.events {
        write_line(events, &line);
    }
    eprintln!("{}", line);
}

pub fn debug(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Debug, domain, event, fields);
}

pub fn info(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Info, domain, event, fields);
}

pub fn warn(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Warn, domain, event, fields);
}

// =============================================================================
// Field helpers
// =============================================================================

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

pub fn v_count(n: usize) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Logs the elapsed time of a block at trace level when dropped.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
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
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse(" DEBUG "), Some(Level::Debug));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_sanitize_redacts_admin_key_any_case() {
        let m = sanitize_fields(obj(&[
            ("X-Admin-Key", v_str("secret")),
            ("admin_key", v_str("secret")),
            ("path", v_str("/api/personas")),
        ]));
        assert_eq!(m.get("X-Admin-Key").unwrap(), "[REDACTED]");
        assert_eq!(m.get("admin_key").unwrap(), "[REDACTED]");
        assert_eq!(m.get("path").unwrap(), "/api/personas");
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
