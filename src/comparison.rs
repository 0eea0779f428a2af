//! Double-blind pairwise review.
//!
//! Reviewers see two anonymised responses in slots A and B and pick one. Any
//! ranking built from the votes happens on the server; this module only
//! validates votes and keeps persona identity out of what reviewers see.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::Metadata;

#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    #[error("winner slot must be A or B, got {0:?}")]
    InvalidSlot(String),
    #[error("confidence must be between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("comparison pair {0} does not hold two distinct responses")]
    IncompletePair(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn parse(raw: &str) -> Result<Self, ComparisonError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Slot::A),
            "B" => Ok(Slot::B),
            _ => Err(ComparisonError::InvalidSlot(raw.to_string())),
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::A => write!(f, "A"),
            Slot::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Scenario,
    Game,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub slot: Slot,
    #[serde(alias = "response_id")]
    pub response_id: String,
    #[serde(default, alias = "recorded_at")]
    pub recorded_at: Option<String>,
    #[serde(default)]
    pub adapter: Option<String>,
    #[serde(default)]
    pub summary: Metadata,
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub trace: Vec<Value>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPair {
    pub id: String,
    #[serde(alias = "target_id")]
    pub target_id: String,
    #[serde(alias = "target_kind")]
    pub target_kind: TargetKind,
    #[serde(alias = "created_at")]
    pub created_at: String,
    #[serde(default)]
    pub adapter: Option<String>,
    pub status: String,
    pub responses: Vec<ComparisonResponse>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ComparisonPair {
    pub fn response_for(&self, slot: Slot) -> Option<&ComparisonResponse> {
        self.responses.iter().find(|r| r.slot == slot)
    }

    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }

    /// A pair can take votes only when both slots hold different responses.
    pub fn ensure_votable(&self) -> Result<(), ComparisonError> {
        match (self.response_for(Slot::A), self.response_for(Slot::B)) {
            (Some(a), Some(b)) if a.response_id != b.response_id => Ok(()),
            _ => Err(ComparisonError::IncompletePair(self.id.clone())),
        }
    }
}

/// Request body for generating a new pair (sent in the service's
/// snake_case format).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_kind: Option<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub exclude_responses: Vec<String>,
}

/// A reviewer's choice, sent in the service's snake_case format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteSubmission {
    pub winner_slot: Slot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub metadata: Metadata,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl VoteSubmission {
    pub fn new(winner_slot: Slot) -> Self {
        Self {
            winner_slot,
            reviewer: None,
            rationale: None,
            confidence: None,
            metadata: Metadata::new(),
        }
    }

    pub fn reviewer(mut self, reviewer: &str) -> Self {
        self.reviewer = Some(reviewer.to_string());
        self
    }

    pub fn rationale(mut self, rationale: &str) -> Self {
        self.rationale = Some(rationale.to_string());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Trims free text and rejects confidences outside [0, 1].
    pub fn validate(self) -> Result<Self, ComparisonError> {
        if let Some(c) = self.confidence {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(ComparisonError::ConfidenceOutOfRange(c));
            }
        }
        Ok(Self {
            reviewer: non_empty(self.reviewer),
            rationale: non_empty(self.rationale),
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonVote {
    pub id: String,
    #[serde(alias = "pair_id")]
    pub pair_id: String,
    #[serde(alias = "winner_slot")]
    pub winner_slot: Slot,
    #[serde(alias = "winning_response_id")]
    pub winning_response_id: String,
    #[serde(alias = "losing_response_id")]
    pub losing_response_id: String,
    #[serde(alias = "recorded_at")]
    pub recorded_at: String,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSummary {
    #[serde(alias = "total_votes")]
    pub total_votes: u64,
    #[serde(alias = "pair_count")]
    pub pair_count: u64,
    #[serde(alias = "persona_count")]
    pub persona_count: u64,
    #[serde(default, alias = "last_vote_recorded_at")]
    pub last_vote_recorded_at: Option<String>,
    pub converged: bool,
    pub iterations: u64,
    #[serde(default, alias = "target_id")]
    pub target_id: Option<String>,
}

/// Server-computed rankings, displayed as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAggregation {
    #[serde(default)]
    pub rankings: BTreeMap<String, f64>,
    pub summary: AggregationSummary,
}

impl ComparisonAggregation {
    /// Highest score first.
    pub fn ordered(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> =
            self.rankings.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out
    }
}

fn strip_persona_keys(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("persona_"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Copy of the pair with every `persona_*` key removed from the pair and
/// response metadata and from response summaries.
pub fn blind_view(pair: &ComparisonPair) -> ComparisonPair {
    let mut blind = pair.clone();
    blind.metadata = strip_persona_keys(&pair.metadata);
    for response in blind.responses.iter_mut() {
        response.metadata = strip_persona_keys(&response.metadata);
        response.summary = strip_persona_keys(&response.summary);
    }
    blind
}

/// Pairs still waiting for a vote, in the order given.
pub fn pending_pairs(pairs: &[ComparisonPair]) -> Vec<&ComparisonPair> {
    pairs.iter().filter(|p| !p.is_completed()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair() -> ComparisonPair {
        serde_json::from_value(json!({
            "id": "pair-1",
            "target_id": "solitaire-practice",
            "target_kind": "scenario",
            "created_at": "2024-04-01T00:00:00Z",
            "status": "pending",
            "metadata": {"persona_a": "planner", "target_title": "Solitaire"},
            "responses": [
                {"slot": "A", "response_id": "r1", "metadata": {"Persona_Id": "x", "steps": 3}},
                {"slot": "B", "response_id": "r2", "summary": {"persona_name": "y", "score": 1}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_slot_parse() {
        assert_eq!(Slot::parse(" b "), Ok(Slot::B));
        assert_eq!(Slot::parse("a"), Ok(Slot::A));
        assert!(matches!(Slot::parse("C"), Err(ComparisonError::InvalidSlot(_))));
        assert_eq!(Slot::A.other(), Slot::B);
    }

    #[test]
    fn test_blind_view_strips_persona_keys() {
        let blind = blind_view(&pair());
        assert!(blind.metadata.get("persona_a").is_none());
        assert!(blind.metadata.get("target_title").is_some());
        let a = blind.response_for(Slot::A).unwrap();
        assert!(a.metadata.get("Persona_Id").is_none());
        assert_eq!(a.metadata.get("steps"), Some(&json!(3)));
        let b = blind.response_for(Slot::B).unwrap();
        assert!(b.summary.get("persona_name").is_none());
        assert_eq!(b.summary.get("score"), Some(&json!(1)));
    }

    #[test]
    fn test_votable_requires_distinct_slots() {
        let mut p = pair();
        assert!(p.ensure_votable().is_ok());
        p.responses[1].response_id = "r1".to_string();
        assert_eq!(p.ensure_votable(), Err(ComparisonError::IncompletePair("pair-1".to_string())));
        p.responses.pop();
        assert!(p.ensure_votable().is_err());
    }

    #[test]
    fn test_vote_validation() {
        let vote = VoteSubmission::new(Slot::A)
            .reviewer("  ")
            .rationale(" clearer plan ")
            .confidence(0.75)
            .validate()
            .unwrap();
        assert_eq!(vote.reviewer, None);
        assert_eq!(vote.rationale.as_deref(), Some("clearer plan"));

        let body = serde_json::to_value(&vote).unwrap();
        assert_eq!(body["winner_slot"], "A");
        assert!(body.get("reviewer").is_none());

        assert_eq!(
            VoteSubmission::new(Slot::B).confidence(1.5).validate(),
            Err(ComparisonError::ConfidenceOutOfRange(1.5))
        );
        assert!(VoteSubmission::new(Slot::B).confidence(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_pending_and_rankings_order() {
        let mut done = pair();
        done.id = "pair-2".to_string();
        done.status = "completed".to_string();
        let pairs = vec![pair(), done];
        let pending = pending_pairs(&pairs);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "pair-1");

        let agg: ComparisonAggregation = serde_json::from_value(json!({
            "rankings": {"planner": 0.3, "optimizer": 0.7},
            "summary": {"total_votes": 3, "pair_count": 1, "persona_count": 2,
                        "converged": true, "iterations": 12}
        }))
        .unwrap();
        assert_eq!(agg.ordered()[0].0, "optimizer");
    }
}
