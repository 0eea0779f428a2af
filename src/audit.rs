//! Audit log summary for the admin panel.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::format::parse_timestamp;
use crate::model::AuditEvent;

/// The panel lists at most this many events.
pub const AUDIT_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub actors: Vec<String>,
    pub latest_timestamp: Option<String>,
    /// (action, count), most frequent first.
    pub actions: Vec<(String, usize)>,
}

/// Newest first. Events whose timestamp does not parse sort after every
/// parseable one; ties keep their log order.
pub fn recent_events(events: &[AuditEvent], limit: usize) -> Vec<&AuditEvent> {
    let mut keyed: Vec<(Option<i64>, usize, &AuditEvent)> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (parse_timestamp(&e.timestamp).map(|ts| ts.timestamp_millis()), i, e))
        .collect();
    // Log order is oldest first, so later index wins among equal timestamps.
    keyed.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    keyed.into_iter().take(limit).map(|(_, _, e)| e).collect()
}

pub fn summarize_audit(events: &[AuditEvent]) -> AuditSummary {
    let successes = events.iter().filter(|e| e.is_success()).count();
    let actors: BTreeSet<&str> = events.iter().map(|e| e.actor.as_str()).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for e in events {
        *counts.entry(e.action.as_str()).or_default() += 1;
    }
    let mut actions: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(a, n)| (a.to_string(), n))
        .collect();
    actions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    AuditSummary {
        total: events.len(),
        successes,
        failures: events.len() - successes,
        actors: actors.into_iter().map(str::to_string).collect(),
        latest_timestamp: recent_events(events, 1).first().map(|e| e.timestamp.clone()),
        actions,
    }
}
