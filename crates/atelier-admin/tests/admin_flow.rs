//! End-to-end flows through the bootstrapped service graph.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use atelier_admin::{
    AdminRuntime, AdminRuntimeOptions, ConfirmationPort, Mode, ModeChangeOptions, NavigationPort,
    bootstrap_with_transport,
};
use atelier_auth::{InMemoryTokenStorage, TokenStorage};
use atelier_client::{
    ApiClientConfig, ApiClientError, CSRF_TOKEN_HEADER, HttpTransport, TransportRequest,
    TransportResponse,
};
use chrono::{Duration, Utc};
use reqwest::StatusCode;

struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<(u16, String)>) -> Arc<Self> {
        let responses = responses
            .into_iter()
            .map(|(status, body)| TransportResponse {
                status: StatusCode::from_u16(status).expect("valid status"),
                body: body.into_bytes(),
            })
            .collect();
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn header(request: &TransportRequest, name: &str) -> Option<String> {
        request
            .headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.clone())
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, ApiClientError> {
        self.requests.lock().expect("requests lock").push(request);
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or(ApiClientError::Transport {
                message: "script exhausted".to_string(),
            })
    }
}

struct AnswerConfirm {
    answer: AtomicBool,
}

impl AnswerConfirm {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
        })
    }

    fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }
}

impl ConfirmationPort for AnswerConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.answer.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingNav {
    replaced: Mutex<Vec<String>>,
    navigated: Mutex<Vec<String>>,
}

impl RecordingNav {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn replaced(&self) -> Vec<String> {
        self.replaced.lock().expect("replaced lock").clone()
    }

    fn navigated(&self) -> Vec<String> {
        self.navigated.lock().expect("navigated lock").clone()
    }
}

impl NavigationPort for RecordingNav {
    fn replace_url(&self, url: &str) {
        self.replaced
            .lock()
            .expect("replaced lock")
            .push(url.to_string());
    }

    fn navigate(&self, url: &str) {
        self.navigated
            .lock()
            .expect("navigated lock")
            .push(url.to_string());
    }
}

fn active_session_body() -> String {
    r#"{"active":true,"email":"owner@example.com","roles":["admin"]}"#.to_string()
}

fn inactive_session_body() -> String {
    r#"{"active":false}"#.to_string()
}

fn csrf_envelope(token: &str) -> String {
    let expires_at = (Utc::now() + Duration::minutes(10)).to_rfc3339();
    format!(r#"{{"data":{{"token":"{token}","expires_at":"{expires_at}"}}}}"#)
}

fn runtime(
    initial_url: &str,
    storage: Arc<dyn TokenStorage>,
    confirm: Arc<AnswerConfirm>,
    nav: Arc<RecordingNav>,
    transport: Arc<ScriptedTransport>,
) -> AdminRuntime {
    let options = AdminRuntimeOptions {
        api: ApiClientConfig::new("https://atelier.example.com"),
        initial_url: initial_url.to_string(),
    };
    bootstrap_with_transport(options, storage, confirm, nav, transport).expect("runtime")
}

#[tokio::test]
async fn an_admin_url_without_a_session_resolves_to_view_and_is_corrected() {
    let transport = ScriptedTransport::new(vec![(200, inactive_session_body())]);
    let nav = RecordingNav::new();
    let runtime = runtime(
        "/projects?mode=admin",
        Arc::new(InMemoryTokenStorage::new()),
        AnswerConfirm::new(true),
        Arc::clone(&nav),
        Arc::clone(&transport),
    );

    runtime.controller.refresh_session().await;

    assert_eq!(runtime.controller.mode(), Mode::View);
    assert_eq!(runtime.controller.current_url(), "/projects");
    assert_eq!(nav.replaced(), vec!["/projects".to_string()]);
}

#[tokio::test]
async fn dirty_navigation_is_blocked_until_confirmed_and_preserves_mode() {
    let transport = ScriptedTransport::new(vec![(200, active_session_body())]);
    let nav = RecordingNav::new();
    let confirm = AnswerConfirm::new(false);
    let runtime = runtime(
        "/work?mode=admin",
        Arc::new(InMemoryTokenStorage::new()),
        Arc::clone(&confirm),
        Arc::clone(&nav),
        Arc::clone(&transport),
    );

    runtime.controller.refresh_session().await;
    assert_eq!(runtime.controller.mode(), Mode::Admin);

    runtime.controller.register_unsaved_change("form-a");
    assert!(
        !runtime
            .controller
            .navigate_with_mode("/contact", None, ModeChangeOptions::default())
    );
    assert!(nav.navigated().is_empty());

    confirm.set_answer(true);
    assert!(
        runtime
            .controller
            .navigate_with_mode("/contact", None, ModeChangeOptions::default())
    );
    assert_eq!(nav.navigated(), vec!["/contact?mode=admin".to_string()]);
}

#[tokio::test]
async fn a_rejected_bearer_token_converges_the_ui_back_to_view_mode() {
    let storage = Arc::new(InMemoryTokenStorage::new());
    storage.persist("tok_stale").expect("seed token");

    let transport = ScriptedTransport::new(vec![
        (200, active_session_body()),
        (401, "unauthorized".to_string()),
    ]);
    let nav = RecordingNav::new();
    let runtime = runtime(
        "/studio?mode=admin",
        storage,
        AnswerConfirm::new(true),
        Arc::clone(&nav),
        Arc::clone(&transport),
    );

    runtime.controller.refresh_session().await;
    assert_eq!(runtime.controller.mode(), Mode::Admin);
    assert_eq!(
        runtime.controller.session_email().as_deref(),
        Some("owner@example.com")
    );

    let error = runtime
        .client
        .get_json::<serde_json::Value>("/api/admin/bookings")
        .await
        .expect_err("expected 401");
    assert!(matches!(
        error,
        ApiClientError::Http { status, .. } if status == StatusCode::UNAUTHORIZED
    ));

    // The 401 cleared the stored credential; the subscription invalidated
    // the cached session and the controller fell back to view mode.
    assert_eq!(runtime.token_store.token(), None);
    assert_eq!(runtime.controller.mode(), Mode::View);
    assert_eq!(runtime.controller.current_url(), "/studio");
    assert_eq!(nav.replaced(), vec!["/studio".to_string()]);

    // The stale bearer header went out on the failing call.
    let requests = transport.requests();
    assert_eq!(
        ScriptedTransport::header(&requests[1], "authorization").as_deref(),
        Some("Bearer tok_stale")
    );
}

#[tokio::test]
async fn a_stale_anti_forgery_token_heals_with_a_single_retry() {
    let transport = ScriptedTransport::new(vec![
        (200, active_session_body()),
        (200, csrf_envelope("csrf_a")),
        (403, "stale csrf".to_string()),
        (200, csrf_envelope("csrf_b")),
        (200, r#"{"id":"booking-1"}"#.to_string()),
    ]);
    let nav = RecordingNav::new();
    let runtime = runtime(
        "/studio?mode=admin",
        Arc::new(InMemoryTokenStorage::new()),
        AnswerConfirm::new(true),
        nav,
        Arc::clone(&transport),
    );

    runtime.controller.refresh_session().await;

    let payload = serde_json::json!({"date": "2026-09-01"});
    let created: serde_json::Value = runtime
        .client
        .post_json("/api/admin/bookings", &payload)
        .await
        .expect("booking created after retry");
    assert_eq!(created["id"], "booking-1");

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(
        ScriptedTransport::header(&requests[2], CSRF_TOKEN_HEADER).as_deref(),
        Some("csrf_a")
    );
    assert_eq!(
        ScriptedTransport::header(&requests[4], CSRF_TOKEN_HEADER).as_deref(),
        Some("csrf_b")
    );
}

#[tokio::test]
async fn completing_a_login_enables_admin_entry_after_a_refresh() {
    let transport = ScriptedTransport::new(vec![
        (200, inactive_session_body()),
        (200, active_session_body()),
    ]);
    let nav = RecordingNav::new();
    let runtime = runtime(
        "/studio",
        Arc::new(InMemoryTokenStorage::new()),
        AnswerConfirm::new(true),
        nav,
        Arc::clone(&transport),
    );

    runtime.controller.refresh_session().await;
    assert!(
        !runtime
            .controller
            .set_mode(Mode::Admin, ModeChangeOptions::default())
    );

    assert!(runtime.token_store.complete_login("#token=tok_fresh&state=xyz"));
    runtime.controller.refresh_session().await;
    assert!(
        runtime
            .controller
            .set_mode(Mode::Admin, ModeChangeOptions::default())
    );
    assert_eq!(runtime.controller.current_url(), "/studio?mode=admin");

    // The refreshed probe carried the new bearer credential.
    let requests = transport.requests();
    assert_eq!(
        ScriptedTransport::header(&requests[1], "authorization").as_deref(),
        Some("Bearer tok_fresh")
    );
}
