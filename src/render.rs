//! Plain-text panels for the terminal dashboard.

use std::fmt::Write;

use crate::analytics::{DashboardSummary, PersonaAnalysis, ScenarioAnalysis};
use crate::audit::{recent_events, AuditSummary};
use crate::comparison::{ComparisonAggregation, ComparisonPair, Slot};
use crate::format::{format_score, format_timestamp, humanize_snake, truncate};
use crate::model::{AuditEvent, PersonaData, ScenarioData};

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "=== {} ===", title);
}

pub fn summary(s: &DashboardSummary) -> String {
    let mut out = String::new();
    heading(&mut out, "Overview");
    let _ = writeln!(out, "  Personas:            {:>8}", s.persona_count);
    let _ = writeln!(out, "  Scenarios:           {:>8}", s.scenario_count);
    let _ = writeln!(out, "  Results:             {:>8}", s.result_count);
    let _ = writeln!(out, "    algorithmic:       {:>8}", s.algorithmic_count);
    let _ = writeln!(out, "    human:             {:>8}", s.human_count);
    let _ = writeln!(out, "  Overall average:     {:>8}", format_score(s.overall_average));
    let _ = writeln!(out, "  Untested scenarios:  {:>8}", s.untested_scenarios);
    out
}

pub fn scenario_table(rows: &[ScenarioAnalysis]) -> String {
    let mut out = String::new();
    heading(&mut out, "Scenario Analysis");
    if rows.is_empty() {
        let _ = writeln!(out, "  (no scenarios)");
        return out;
    }
    let _ = writeln!(
        out,
        "  {:<24} {:<10} {:<12} {:>7} {:>7} {:>7} {:>5}  {:<16} {:<16}",
        "Scenario", "Difficulty", "Domain", "Avg", "Algo", "Human", "N", "Best", "Worst"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "  {:<24} {:<10} {:<12} {:>7} {:>7} {:>7} {:>5}  {:<16} {:<16}",
            truncate(&r.scenario_name, 24),
            truncate(&humanize_snake(&r.difficulty), 10),
            truncate(&humanize_snake(&r.domain), 12),
            format_score(r.average_score),
            format_score(r.algorithmic_average),
            format_score(r.human_average),
            r.participant_count,
            truncate(&r.best_persona, 16),
            truncate(&r.worst_persona, 16),
        );
    }
    out
}

pub fn persona_table(rows: &[PersonaAnalysis]) -> String {
    let mut out = String::new();
    heading(&mut out, "Persona Analysis");
    if rows.is_empty() {
        let _ = writeln!(out, "  (no personas)");
        return out;
    }
    let _ = writeln!(
        out,
        "  {:<24} {:<8} {:>7} {:>7} {:>7} {:>5}  {:<20} {:<20}",
        "Persona", "Source", "Avg", "Algo", "Human", "N", "Best", "Worst"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "  {:<24} {:<8} {:>7} {:>7} {:>7} {:>5}  {:<20} {:<20}",
            truncate(&r.persona_name, 24),
            truncate(&r.source, 8),
            format_score(r.average_score),
            format_score(r.algorithmic_average),
            format_score(r.human_average),
            r.scenario_count,
            truncate(&r.best_scenario, 20),
            truncate(&r.worst_scenario, 20),
        );
    }
    out
}

pub fn persona_list(personas: &[PersonaData]) -> String {
    let mut out = String::new();
    heading(&mut out, "Personas");
    for p in personas {
        let version = p.version.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:<24} {:<24} {:<8} {}",
            truncate(&p.id, 24),
            truncate(&p.name, 24),
            p.source,
            version
        );
        if let Some(desc) = &p.description {
            let _ = writeln!(out, "      {}", truncate(desc, 72));
        }
    }
    out
}

pub fn audit_panel(summary: &AuditSummary, events: &[AuditEvent], limit: usize) -> String {
    let mut out = String::new();
    heading(&mut out, "Audit Log");
    let _ = writeln!(out, "  Events:    {:>6}", summary.total);
    let _ = writeln!(out, "  Succeeded: {:>6}", summary.successes);
    let _ = writeln!(out, "  Failed:    {:>6}", summary.failures);
    let _ = writeln!(out, "  Actors:    {}", summary.actors.join(", "));
    if let Some(ts) = &summary.latest_timestamp {
        let _ = writeln!(out, "  Latest:    {}", format_timestamp(ts));
    }
    for (action, count) in &summary.actions {
        let _ = writeln!(out, "    {:<28} {:>6}", action, count);
    }
    let _ = writeln!(out);
    let recent = recent_events(events, limit);
    let _ = writeln!(out, "  Most recent {}:", recent.len());
    for e in recent {
        let mark = if e.is_success() { "ok" } else { "!!" };
        let _ = writeln!(
            out,
            "  [{}] {:<23} {:<24} {:<28} {}",
            mark,
            format_timestamp(&e.timestamp),
            truncate(&e.action, 24),
            truncate(&e.subject, 28),
            e.actor
        );
    }
    out
}

/// Pretty-printed raw definition, or the parsed fields when no raw
/// definition was fetched.
pub fn scenario_source(scenario: &ScenarioData) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("Scenario Source: {}", scenario.name));
    let body = match &scenario.definition {
        Some(def) => serde_json::to_string_pretty(def),
        None => serde_json::to_string_pretty(scenario),
    };
    match body {
        Ok(text) => {
            let _ = writeln!(out, "{}", text);
        }
        Err(err) => {
            let _ = writeln!(out, "  (unrenderable: {})", err);
        }
    }
    out
}

/// One line per pair. Expects blinded pairs.
pub fn pair_list(pairs: &[ComparisonPair]) -> String {
    let mut out = String::new();
    heading(&mut out, "Comparison Pairs");
    if pairs.is_empty() {
        let _ = writeln!(out, "  (no pairs)");
        return out;
    }
    let _ = writeln!(out, "  {:<36} {:<28} {:<10} {}", "Pair", "Target", "Status", "Created");
    for p in pairs {
        let _ = writeln!(
            out,
            "  {:<36} {:<28} {:<10} {}",
            truncate(&p.id, 36),
            truncate(&p.target_id, 28),
            truncate(&p.status, 10),
            format_timestamp(&p.created_at)
        );
    }
    out
}

/// Reviewer view of a pair. Expects a blinded pair.
pub fn comparison_pair(pair: &ComparisonPair) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("Comparison {}", pair.id));
    let _ = writeln!(out, "  Target:  {} ({:?})", pair.target_id, pair.target_kind);
    let _ = writeln!(out, "  Status:  {}", pair.status);
    let _ = writeln!(out, "  Created: {}", format_timestamp(&pair.created_at));
    for slot in [Slot::A, Slot::B] {
        let _ = writeln!(out);
        let _ = writeln!(out, "  --- Response {} ---", slot);
        match pair.response_for(slot) {
            Some(r) => {
                for (k, v) in &r.summary {
                    let _ = writeln!(out, "    {:<20} {}", humanize_snake(k), v);
                }
                let _ = writeln!(out, "    {:<20} {}", "Steps", r.steps.len());
                let _ = writeln!(out, "    {:<20} {}", "Trace entries", r.trace.len());
            }
            None => {
                let _ = writeln!(out, "    (missing)");
            }
        }
    }
    out
}

pub fn rankings(agg: &ComparisonAggregation) -> String {
    let mut out = String::new();
    heading(&mut out, "Pairwise Rankings");
    let s = &agg.summary;
    let _ = writeln!(
        out,
        "  votes={} pairs={} personas={} converged={} iterations={}",
        s.total_votes, s.pair_count, s.persona_count, s.converged, s.iterations
    );
    for (rank, (persona, score)) in agg.ordered().into_iter().enumerate() {
        let _ = writeln!(out, "  {:>3}. {:<28} {:.4}", rank + 1, persona, score);
    }
    out
}
