use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::form_urlencoded;

use super::path::resolve_target;
use super::transport::{ApiRequest, ApiResponse, PreparedRequest, Transport};
use super::ApiError;
use crate::auth::AdminSession;
use crate::comparison::{
    ComparisonAggregation, ComparisonPair, ComparisonVote, PairRequest, VoteSubmission,
};
use crate::logging::{debug, info, obj, v_count, v_str, Domain};
use crate::model::{AuditEvent, EvaluationResult, PersonaData, ScenarioData, Snapshot};

/// Percent-encodes one path segment.
fn segment(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// The service files a persona under its `name`, and rejects updates whose
/// path does not match it.
fn persona_name(definition: &Value) -> Result<String, ApiError> {
    match definition.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(ApiError::InvalidDefinition(
            "persona definition needs a non-empty string `name`".to_string(),
        )),
    }
}

/// Request wrappers that carry the admin credential, plus typed calls for the
/// endpoints the dashboard reads and writes.
///
/// Nothing here retries; see `api::retry` for callers that want to.
pub struct ApiClient<T: Transport> {
    transport: T,
    prefix: String,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, prefix: &str) -> Self {
        Self {
            transport,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn prepare(&self, session: &AdminSession, request: ApiRequest, url: String) -> PreparedRequest {
        let mut headers = request.headers;
        if let Some((name, value)) = session.credential_header() {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            headers.push((name.to_string(), value));
        }
        PreparedRequest {
            method: request.method,
            url,
            headers,
            body: request.body,
        }
    }

    /// Sends `request` as-is, adding `X-Admin-Key` when the session holds a
    /// credential. Without one the request goes out unauthenticated.
    pub async fn authorized_fetch(
        &self,
        session: &AdminSession,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let url = request.target.as_raw();
        self.transport.send(self.prepare(session, request, url)).await
    }

    /// Like `authorized_fetch`, with relative targets moved under the API
    /// prefix first.
    pub async fn authorized_api_fetch(
        &self,
        session: &AdminSession,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let url = resolve_target(&request.target, &self.prefix);
        debug(
            Domain::Api,
            "request",
            obj(&[
                ("method", v_str(request.method.as_str())),
                ("url", v_str(&url)),
                ("authorized", Value::Bool(session.has_admin_access())),
            ]),
        );
        self.transport.send(self.prepare(session, request, url)).await
    }

    async fn call<D: DeserializeOwned>(
        &self,
        session: &AdminSession,
        request: ApiRequest,
    ) -> Result<D, ApiError> {
        self.authorized_api_fetch(session, request)
            .await?
            .error_for_status()?
            .json()
    }

    fn require_admin(session: &AdminSession, action: &'static str) -> Result<(), ApiError> {
        if session.has_admin_access() {
            Ok(())
        } else {
            Err(ApiError::AdminRequired(action))
        }
    }

    pub async fn list_personas(
        &self,
        session: &AdminSession,
    ) -> Result<Vec<PersonaData>, ApiError> {
        self.call(session, ApiRequest::get("personas")).await
    }

    pub async fn list_scenarios(
        &self,
        session: &AdminSession,
    ) -> Result<Vec<ScenarioData>, ApiError> {
        self.call(session, ApiRequest::get("scenarios")).await
    }

    pub async fn list_results(
        &self,
        session: &AdminSession,
    ) -> Result<Vec<EvaluationResult>, ApiError> {
        self.call(session, ApiRequest::get("results")).await
    }

    pub async fn list_audit_events(
        &self,
        session: &AdminSession,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEvent>, ApiError> {
        let path = match limit {
            Some(n) => format!("admin/audit?limit={}", n),
            None => "admin/audit".to_string(),
        };
        self.call(session, ApiRequest::get(path)).await
    }

    /// Admin-gated update of the persona named by `definition.name`. Refused
    /// locally when no credential is held or the definition has no name.
    pub async fn save_persona(
        &self,
        session: &AdminSession,
        definition: Value,
    ) -> Result<Value, ApiError> {
        Self::require_admin(session, "saving personas")?;
        let name = persona_name(&definition)?;
        let path = format!("personas/{}", segment(&name));
        let request = ApiRequest::put(path, json!({ "definition": definition }));
        let saved: Value = self.call(session, request).await?;
        info(Domain::Api, "persona_saved", obj(&[("persona", v_str(&name))]));
        Ok(saved)
    }

    pub async fn list_pairs(
        &self,
        session: &AdminSession,
        limit: Option<usize>,
    ) -> Result<Vec<ComparisonPair>, ApiError> {
        let path = match limit {
            Some(n) => format!("admin/evaluations/pairs?limit={}", n),
            None => "admin/evaluations/pairs".to_string(),
        };
        self.call(session, ApiRequest::get(path)).await
    }

    pub async fn get_pair(
        &self,
        session: &AdminSession,
        pair_id: &str,
    ) -> Result<ComparisonPair, ApiError> {
        let path = format!("admin/evaluations/pairs/{}", segment(pair_id));
        self.call(session, ApiRequest::get(path)).await
    }

    pub async fn create_pair(
        &self,
        session: &AdminSession,
        request: &PairRequest,
    ) -> Result<ComparisonPair, ApiError> {
        Self::require_admin(session, "creating comparison pairs")?;
        let body = serde_json::to_value(request)?;
        self.call(session, ApiRequest::post("admin/evaluations/pairs", body))
            .await
    }

    /// Validates the vote and the pair, then records it.
    pub async fn submit_vote(
        &self,
        session: &AdminSession,
        pair: &ComparisonPair,
        vote: VoteSubmission,
    ) -> Result<ComparisonVote, ApiError> {
        Self::require_admin(session, "submitting votes")?;
        pair.ensure_votable()?;
        let vote = vote.validate()?;
        let path = format!("admin/evaluations/pairs/{}/votes", segment(&pair.id));
        let body = serde_json::to_value(&vote)?;
        let recorded: ComparisonVote = self.call(session, ApiRequest::post(path, body)).await?;
        info(
            Domain::Vote,
            "vote_recorded",
            obj(&[("pair_id", v_str(&pair.id)), ("vote_id", v_str(&recorded.id))]),
        );
        Ok(recorded)
    }

    pub async fn fetch_aggregate(
        &self,
        session: &AdminSession,
        target: Option<&str>,
    ) -> Result<ComparisonAggregation, ApiError> {
        let path = match target {
            Some(t) => {
                let query: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("target", t)
                    .finish();
                format!("admin/evaluations/aggregate?{}", query)
            }
            None => "admin/evaluations/aggregate".to_string(),
        };
        self.call(session, ApiRequest::get(path)).await
    }

    /// Personas, scenarios and results; the audit log too when the session
    /// has admin access.
    pub async fn load_snapshot(&self, session: &AdminSession) -> Result<Snapshot, ApiError> {
        let personas = self.list_personas(session).await?;
        let scenarios = self.list_scenarios(session).await?;
        let results = self.list_results(session).await?;
        let audit = if session.has_admin_access() {
            self.list_audit_events(session, None).await?
        } else {
            Vec::new()
        };
        info(
            Domain::Api,
            "snapshot_loaded",
            obj(&[
                ("personas", v_count(personas.len())),
                ("scenarios", v_count(scenarios.len())),
                ("results", v_count(results.len())),
                ("audit", v_count(audit.len())),
            ]),
        );
        Ok(Snapshot {
            personas,
            scenarios,
            results,
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("cooperative planner"), "cooperative%20planner");
        assert_eq!(segment("a/b"), "a%2Fb");
        assert_eq!(segment("plain-id_1"), "plain-id_1");
    }

    #[test]
    fn test_persona_name_comes_from_definition() {
        let name = persona_name(&json!({"name": "cooperative_planner"})).unwrap();
        assert_eq!(name, "cooperative_planner");
        assert!(matches!(
            persona_name(&json!({"name": "  "})),
            Err(ApiError::InvalidDefinition(_))
        ));
        assert!(persona_name(&json!({"name": 3})).is_err());
        assert!(persona_name(&json!({})).is_err());
    }
}
