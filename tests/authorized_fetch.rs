//! Credential injection and path handling, exercised through a transport
//! that records what would have gone on the wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use url::Url;

use personabench_dashboard::api::{
    ApiClient, ApiError, ApiRequest, ApiResponse, ApiTarget, PreparedRequest, Transport,
};
use personabench_dashboard::auth::{AdminSession, ADMIN_KEY_HEADER};
use personabench_dashboard::comparison::{ComparisonPair, Slot, VoteSubmission};
use personabench_dashboard::storage::SqliteCredentialStore;

#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<PreparedRequest>>>,
    replies: Arc<Mutex<VecDeque<Result<ApiResponse, ApiError>>>>,
}

impl Recorder {
    fn reply(&self, status: u16, body: serde_json::Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ApiResponse { status, body: body.to_string() }));
    }

    fn fail(&self, msg: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Transport(msg.to_string())));
    }

    fn sent(&self) -> Vec<PreparedRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError> {
        self.sent.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse { status: 200, body: "[]".to_string() }))
    }
}

fn client() -> (ApiClient<Recorder>, Recorder) {
    let recorder = Recorder::default();
    (ApiClient::new(recorder.clone(), "/api"), recorder)
}

fn session_with(key: &str) -> AdminSession {
    let mut session = AdminSession::in_memory();
    session.initialize();
    session.set_admin_key(key);
    session
}

fn pair_json() -> serde_json::Value {
    json!({
        "id": "pair-1",
        "target_id": "solitaire-practice",
        "target_kind": "scenario",
        "created_at": "2024-04-01T00:00:00Z",
        "status": "pending",
        "responses": [
            {"slot": "A", "response_id": "r1"},
            {"slot": "B", "response_id": "r2"}
        ]
    })
}

#[tokio::test]
async fn credential_header_follows_session() {
    let (client, rec) = client();
    let mut session = session_with("  abc ");

    let request = ApiRequest::get("personas").header("Accept", "application/json");
    client.authorized_api_fetch(&session, request).await.unwrap();
    session.clear_admin_key();
    client.authorized_api_fetch(&session, ApiRequest::get("personas")).await.unwrap();

    let sent = rec.sent();
    assert_eq!(sent[0].url, "/api/personas");
    assert_eq!(sent[0].header(ADMIN_KEY_HEADER), Some("abc"));
    assert_eq!(sent[0].header("accept"), Some("application/json"));
    assert_eq!(sent[1].header(ADMIN_KEY_HEADER), None);
}

#[tokio::test]
async fn caller_supplied_key_header_is_replaced() {
    let (client, rec) = client();
    let session = session_with("fresh");
    client
        .authorized_fetch(&session, ApiRequest::get("/api/personas").header("x-admin-key", "stale"))
        .await
        .unwrap();
    let sent = rec.sent();
    let keys: Vec<&str> = sent[0]
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case(ADMIN_KEY_HEADER))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(keys, vec!["fresh"]);
}

#[tokio::test]
async fn plain_fetch_does_not_rewrite_paths() {
    let (client, rec) = client();
    let session = AdminSession::in_memory();
    client.authorized_fetch(&session, ApiRequest::get("health")).await.unwrap();
    let page = Url::parse("http://ui.test/scenarios?x=1").unwrap();
    client
        .authorized_api_fetch(&session, ApiRequest::get(ApiTarget::Url(page)))
        .await
        .unwrap();
    client
        .authorized_api_fetch(&session, ApiRequest::get("https://other.test/status"))
        .await
        .unwrap();
    let urls: Vec<String> = rec.sent().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["health", "/api/scenarios?x=1", "https://other.test/status"]);
}

#[tokio::test]
async fn non_success_is_a_response_for_wrappers_and_an_error_for_helpers() {
    let (client, rec) = client();
    let session = AdminSession::in_memory();
    rec.reply(403, json!({"detail": "Admin access required"}));
    let resp = client.authorized_api_fetch(&session, ApiRequest::get("admin/audit")).await.unwrap();
    assert_eq!(resp.status, 403);

    rec.reply(403, json!({"detail": "Admin access required"}));
    let err = client.list_audit_events(&session, Some(20)).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 403, .. }));
    assert_eq!(rec.sent()[1].url, "/api/admin/audit?limit=20");
}

#[tokio::test]
async fn network_failure_propagates() {
    let (client, rec) = client();
    rec.fail("connection refused");
    let err = client.list_personas(&AdminSession::in_memory()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn admin_actions_are_refused_without_a_key() {
    let (client, rec) = client();
    let session = AdminSession::in_memory();
    let err = client
        .save_persona(&session, json!({"name": "planner"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AdminRequired(_)));
    assert!(rec.sent().is_empty());
}

#[tokio::test]
async fn save_persona_files_definition_under_its_name() {
    let (client, rec) = client();
    let session = session_with("k");
    rec.reply(200, json!({"name": "Cooperative Planner", "version": "1.0"}));
    let definition = json!({"name": "Cooperative Planner", "version": "1.0"});
    client.save_persona(&session, definition.clone()).await.unwrap();

    let sent = &rec.sent()[0];
    assert_eq!(sent.method, reqwest::Method::PUT);
    assert_eq!(sent.url, "/api/personas/Cooperative%20Planner");
    assert_eq!(sent.body, Some(json!({ "definition": definition })));
}

#[tokio::test]
async fn save_persona_without_name_is_refused_locally() {
    let (client, rec) = client();
    let session = session_with("k");
    for definition in [json!({"version": "1.0"}), json!({"name": "  "}), json!({"name": 7})] {
        let err = client.save_persona(&session, definition).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidDefinition(_)));
    }
    assert!(rec.sent().is_empty());
}

#[tokio::test]
async fn vote_is_validated_then_posted() {
    let (client, rec) = client();
    let session = session_with("k");
    let pair: ComparisonPair = serde_json::from_value(pair_json()).unwrap();

    let err = client
        .submit_vote(&session, &pair, VoteSubmission::new(Slot::A).confidence(2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Comparison(_)));
    assert!(rec.sent().is_empty());

    rec.reply(201, json!({
        "id": "vote-1", "pair_id": "pair-1", "winner_slot": "B",
        "winning_response_id": "r2", "losing_response_id": "r1",
        "recorded_at": "2024-04-01T00:01:00Z"
    }));
    let vote = client
        .submit_vote(&session, &pair, VoteSubmission::new(Slot::B).rationale("tighter plan"))
        .await
        .unwrap();
    assert_eq!(vote.winning_response_id, "r2");
    let sent = &rec.sent()[0];
    assert_eq!(sent.url, "/api/admin/evaluations/pairs/pair-1/votes");
    assert_eq!(sent.body.as_ref().unwrap()["winner_slot"], "B");
    assert_eq!(sent.header(ADMIN_KEY_HEADER), Some("k"));
}

#[tokio::test]
async fn snapshot_skips_audit_without_access() {
    let (client, rec) = client();
    let session = AdminSession::in_memory();
    let snap = client.load_snapshot(&session).await.unwrap();
    assert!(snap.personas.is_empty());
    let urls: Vec<String> = rec.sent().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["/api/personas", "/api/scenarios", "/api/results"]);
}

#[test]
fn saved_key_survives_a_new_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cred.sqlite");
    let path = path.to_str().unwrap();

    let mut first = AdminSession::new(Box::new(SqliteCredentialStore::open(path).unwrap()));
    first.initialize();
    assert!(!first.has_admin_access());
    first.set_admin_key(" persisted ");
    drop(first);

    let mut second = AdminSession::new(Box::new(SqliteCredentialStore::open(path).unwrap()));
    second.initialize();
    assert_eq!(second.admin_key(), "persisted");
    second.clear_admin_key();
    drop(second);

    let mut third = AdminSession::new(Box::new(SqliteCredentialStore::open(path).unwrap()));
    third.initialize();
    assert!(!third.has_admin_access());
}
