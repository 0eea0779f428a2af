//! Wire types exchanged with the orchestration service.
//!
//! Field names follow the dashboard's camelCase format. The snake_case names
//! emitted by the backend are accepted as aliases on input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PersonaWire")]
pub struct PersonaData {
    pub id: String,
    pub name: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_source() -> String {
    "local".to_string()
}

/// Persona as received. The service's listing carries no `id`; personas are
/// addressed by name there, so the name stands in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonaWire {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl From<PersonaWire> for PersonaData {
    fn from(wire: PersonaWire) -> Self {
        let id = wire
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| wire.name.clone());
        Self {
            id,
            name: wire.name,
            source: wire.source,
            description: wire.description,
            version: wire.version,
        }
    }
}

impl PersonaData {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source: default_source(),
            description: None,
            version: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.source == "local"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioData {
    #[serde(alias = "key")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default, alias = "environment")]
    pub domain: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw definition as fetched, shown verbatim by the source panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
}

impl ScenarioData {
    pub fn new(id: &str, name: &str, difficulty: &str, domain: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            difficulty: difficulty.to_string(),
            domain: domain.to_string(),
            instructions: String::new(),
            criteria: Vec::new(),
            constraints: Vec::new(),
            tags: Vec::new(),
            definition: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Algorithmic,
    Human,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Algorithmic => "algorithmic",
            ResultType::Human => "human",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "scenario_id")]
    pub scenario_id: String,
    #[serde(alias = "persona_id")]
    pub persona_id: String,
    #[serde(alias = "overall_score")]
    pub overall_score: f64,
    #[serde(rename = "type")]
    pub kind: ResultType,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl EvaluationResult {
    pub fn new(scenario_id: &str, persona_id: &str, overall_score: f64, kind: ResultType) -> Self {
        Self {
            id: None,
            scenario_id: scenario_id.to_string(),
            persona_id: persona_id.to_string(),
            overall_score,
            kind,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub status: String,
    pub action: String,
    pub subject: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AuditEvent {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// Everything the analytics views need, fetched together or loaded from a
/// JSON file for offline use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub personas: Vec<PersonaData>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioData>,
    #[serde(default)]
    pub results: Vec<EvaluationResult>,
    #[serde(default)]
    pub audit: Vec<AuditEvent>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn scenario(&self, id: &str) -> Option<&ScenarioData> {
        self.scenarios.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_accepts_both_casings() {
        let camel: EvaluationResult = serde_json::from_value(json!({
            "scenarioId": "s1", "personaId": "p1", "overallScore": 0.5, "type": "human"
        }))
        .unwrap();
        let snake: EvaluationResult = serde_json::from_value(json!({
            "scenario_id": "s1", "persona_id": "p1", "overall_score": 0.5, "type": "human"
        }))
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.kind, ResultType::Human);
    }

    #[test]
    fn test_result_serializes_type_field() {
        let r = EvaluationResult::new("s1", "p1", 0.25, ResultType::Algorithmic);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], "algorithmic");
        assert_eq!(v["overallScore"], 0.25);
        assert!(v.get("id").is_none());
    }

    #[test]
    fn test_scenario_from_backend_summary() {
        let s: ScenarioData = serde_json::from_value(json!({
            "key": "blackjack-basic",
            "title": "Blackjack Basics",
            "environment": "blackjack",
            "tags": ["cards"]
        }))
        .unwrap();
        assert_eq!(s.id, "blackjack-basic");
        assert_eq!(s.name, "Blackjack Basics");
        assert_eq!(s.domain, "blackjack");
        assert_eq!(s.difficulty, "");
        assert!(s.definition.is_none());
    }

    #[test]
    fn test_persona_source_defaults_to_local() {
        let p: PersonaData = serde_json::from_value(json!({"id": "p", "name": "P"})).unwrap();
        assert!(p.is_local());
        assert_eq!(p.id, "p");
    }

    #[test]
    fn test_persona_summary_listing_uses_name_as_id() {
        let raw = r#"[{"name":"cooperative_planner","version":"1.0.0","description":"x",
            "risk_tolerance":0.2,"tools":[],"source_path":"personas/cooperative_planner.yaml",
            "definition":{"name":"cooperative_planner"}}]"#;
        let personas: Vec<PersonaData> = serde_json::from_str(raw).unwrap();
        assert_eq!(personas.len(), 1);
        assert_eq!(personas[0].id, "cooperative_planner");
        assert_eq!(personas[0].name, "cooperative_planner");
        assert_eq!(personas[0].version.as_deref(), Some("1.0.0"));
        assert!(personas[0].is_local());

        let blank: PersonaData = serde_json::from_value(json!({"id": " ", "name": "n"})).unwrap();
        assert_eq!(blank.id, "n");
    }

    #[test]
    fn test_snapshot_missing_sections_default_empty() {
        let snap = Snapshot::from_json(r#"{"personas": []}"#).unwrap();
        assert!(snap.scenarios.is_empty());
        assert!(snap.results.is_empty());
        assert!(snap.audit.is_empty());
    }
}
