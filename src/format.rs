//! Display helpers shared by the renderers.

use chrono::{DateTime, Utc};

pub const PLACEHOLDER: &str = "—";

/// `0.7667` -> `"76.7%"`.
pub fn format_score(score: f64) -> String {
    if !score.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{:.1}%", score * 100.0)
}

pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{:.*}", decimals, value)
}

/// RFC 3339 in, `YYYY-MM-DD HH:MM:SS UTC` out. Anything unparseable is
/// returned as given.
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => raw.to_string(),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// `"human_review"` -> `"Human Review"`.
pub fn humanize_snake(raw: &str) -> String {
    raw.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Char-aware truncation with a trailing ellipsis.
pub fn truncate(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        return raw.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = raw.chars().take(max - 1).collect();
    out.push('…');
    out
}
