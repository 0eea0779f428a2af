//! Score summaries derived from flat evaluation results.
//!
//! Every function here is total: empty inputs and dangling references degrade
//! to zero averages and `"N/A"` names, never to errors. Results are recomputed
//! from scratch on each call.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::logging::{v_count, ProfileScope};
use crate::model::{EvaluationResult, PersonaData, ResultType, ScenarioData};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAnalysis {
    pub scenario_id: String,
    pub scenario_name: String,
    pub difficulty: String,
    pub domain: String,
    pub average_score: f64,
    pub best_persona: String,
    pub worst_persona: String,
    pub participant_count: usize,
    pub algorithmic_average: f64,
    pub human_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaAnalysis {
    pub persona_id: String,
    pub persona_name: String,
    pub source: String,
    pub average_score: f64,
    pub best_scenario: String,
    pub worst_scenario: String,
    pub scenario_count: usize,
    pub algorithmic_average: f64,
    pub human_average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub persona_count: usize,
    pub scenario_count: usize,
    pub result_count: usize,
    pub algorithmic_count: usize,
    pub human_count: usize,
    pub overall_average: f64,
    pub untested_scenarios: usize,
}

/// Running (count, sum) for one group.
#[derive(Debug, Clone, Copy, Default)]
struct ScoreAcc {
    count: usize,
    sum: f64,
}

impl ScoreAcc {
    fn push(&mut self, score: f64) {
        self.count += 1;
        self.sum += score;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn mean_where<F>(rows: &[&EvaluationResult], pred: F) -> f64
where
    F: Fn(&EvaluationResult) -> bool,
{
    let mut acc = ScoreAcc::default();
    for r in rows {
        if pred(*r) {
            acc.push(r.overall_score);
        }
    }
    acc.mean()
}

/// Groups rows by `key`, keeping only keys that `resolve` maps to a display
/// name. Groups come back in first-encounter order.
fn named_groups<'a, K, R>(rows: &[&'a EvaluationResult], key: K, resolve: R) -> Vec<(String, f64)>
where
    K: Fn(&'a EvaluationResult) -> &'a str,
    R: Fn(&str) -> Option<String>,
{
    let mut order: Vec<(&'a str, String)> = Vec::new();
    let mut groups: HashMap<&'a str, ScoreAcc> = HashMap::new();
    for row in rows {
        let k = key(*row);
        if !groups.contains_key(k) {
            let Some(name) = resolve(k) else { continue };
            order.push((k, name));
        }
        groups.entry(k).or_default().push(row.overall_score);
    }
    order
        .into_iter()
        .map(|(k, name)| (name, groups[k].mean()))
        .collect()
}

/// Strict comparison on both ends: the first group encountered keeps a tie.
/// With all means equal the same name is both best and worst.
fn best_and_worst(groups: &[(String, f64)]) -> (String, String) {
    let mut best: Option<&(String, f64)> = None;
    let mut worst: Option<&(String, f64)> = None;
    for g in groups {
        if best.map_or(true, |b| g.1 > b.1) {
            best = Some(g);
        }
        if worst.map_or(true, |w| g.1 < w.1) {
            worst = Some(g);
        }
    }
    let name = |g: Option<&(String, f64)>| {
        g.map(|(n, _)| n.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    (name(best), name(worst))
}

pub fn analyze_scenario(
    scenario: &ScenarioData,
    personas: &HashMap<&str, &PersonaData>,
    results: &[EvaluationResult],
) -> ScenarioAnalysis {
    let rows: Vec<&EvaluationResult> = results
        .iter()
        .filter(|r| r.scenario_id == scenario.id)
        .collect();

    let mut analysis = ScenarioAnalysis {
        scenario_id: scenario.id.clone(),
        scenario_name: scenario.name.clone(),
        difficulty: scenario.difficulty.clone(),
        domain: scenario.domain.clone(),
        average_score: 0.0,
        best_persona: NOT_AVAILABLE.to_string(),
        worst_persona: NOT_AVAILABLE.to_string(),
        participant_count: 0,
        algorithmic_average: 0.0,
        human_average: 0.0,
    };
    if rows.is_empty() {
        return analysis;
    }

    analysis.average_score = mean_where(&rows, |_| true);
    analysis.algorithmic_average = mean_where(&rows, |r| r.kind == ResultType::Algorithmic);
    analysis.human_average = mean_where(&rows, |r| r.kind == ResultType::Human);

    let groups = named_groups(&rows, |r| r.persona_id.as_str(), |id| {
        personas.get(id).map(|p| p.name.clone())
    });
    let (best, worst) = best_and_worst(&groups);
    analysis.best_persona = best;
    analysis.worst_persona = worst;

    analysis.participant_count = rows
        .iter()
        .map(|r| r.persona_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    analysis
}

/// One record per scenario, in input order.
pub fn analyze_scenarios(
    personas: &[PersonaData],
    scenarios: &[ScenarioData],
    results: &[EvaluationResult],
) -> Vec<ScenarioAnalysis> {
    let _scope = ProfileScope::with_context(
        "analyze_scenarios",
        &[("scenarios", v_count(scenarios.len())), ("results", v_count(results.len()))],
    );
    let by_id: HashMap<&str, &PersonaData> = personas.iter().map(|p| (p.id.as_str(), p)).collect();
    scenarios
        .iter()
        .map(|s| analyze_scenario(s, &by_id, results))
        .collect()
}

pub fn analyze_persona(
    persona: &PersonaData,
    scenarios: &HashMap<&str, &ScenarioData>,
    results: &[EvaluationResult],
) -> PersonaAnalysis {
    let rows: Vec<&EvaluationResult> = results
        .iter()
        .filter(|r| r.persona_id == persona.id)
        .collect();

    let mut analysis = PersonaAnalysis {
        persona_id: persona.id.clone(),
        persona_name: persona.name.clone(),
        source: persona.source.clone(),
        average_score: 0.0,
        best_scenario: NOT_AVAILABLE.to_string(),
        worst_scenario: NOT_AVAILABLE.to_string(),
        scenario_count: 0,
        algorithmic_average: 0.0,
        human_average: 0.0,
    };
    if rows.is_empty() {
        return analysis;
    }

    analysis.average_score = mean_where(&rows, |_| true);
    analysis.algorithmic_average = mean_where(&rows, |r| r.kind == ResultType::Algorithmic);
    analysis.human_average = mean_where(&rows, |r| r.kind == ResultType::Human);

    let groups = named_groups(&rows, |r| r.scenario_id.as_str(), |id| {
        scenarios.get(id).map(|s| s.name.clone())
    });
    let (best, worst) = best_and_worst(&groups);
    analysis.best_scenario = best;
    analysis.worst_scenario = worst;

    analysis.scenario_count = rows
        .iter()
        .map(|r| r.scenario_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    analysis
}

/// One record per persona, in input order.
pub fn analyze_personas(
    personas: &[PersonaData],
    scenarios: &[ScenarioData],
    results: &[EvaluationResult],
) -> Vec<PersonaAnalysis> {
    let _scope = ProfileScope::with_context(
        "analyze_personas",
        &[("personas", v_count(personas.len())), ("results", v_count(results.len()))],
    );
    let by_id: HashMap<&str, &ScenarioData> =
        scenarios.iter().map(|s| (s.id.as_str(), s)).collect();
    personas
        .iter()
        .map(|p| analyze_persona(p, &by_id, results))
        .collect()
}

pub fn summarize(
    personas: &[PersonaData],
    scenarios: &[ScenarioData],
    results: &[EvaluationResult],
) -> DashboardSummary {
    let all: Vec<&EvaluationResult> = results.iter().collect();
    let tested: HashSet<&str> = results.iter().map(|r| r.scenario_id.as_str()).collect();
    DashboardSummary {
        persona_count: personas.len(),
        scenario_count: scenarios.len(),
        result_count: results.len(),
        algorithmic_count: results.iter().filter(|r| r.kind == ResultType::Algorithmic).count(),
        human_count: results.iter().filter(|r| r.kind == ResultType::Human).count(),
        overall_average: mean_where(&all, |_| true),
        untested_scenarios: scenarios.iter().filter(|s| !tested.contains(s.id.as_str())).count(),
    }
}
