//! Shared fixtures for the unit tests: a recording HTTP spy, collaborator
//! stubs and client builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::client::ApiClient;
use crate::config::{ApiConfig, Consent};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::providers::{
    ConsentPrompt, GameSessionProof, NotificationProvider, StatusUpdateProvider,
    TranslationProvider,
};
use crate::request::Request;
use crate::socket::mock::MockSocketFactory;
use crate::types::Profile;

pub(crate) const TEST_UUID: &str = "1234567890abcdef1234567890abcdef";

/// Records every request; replies from the configured stubs, `200 {}` by
/// default. Stubs are matched by URL substring, first match wins.
pub(crate) struct RecordingHttpClient {
    calls: Mutex<Vec<HttpRequest>>,
    canned: Mutex<Vec<(String, HttpResponse)>>,
    failing: AtomicBool,
}

impl RecordingHttpClient {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            canned: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub(crate) fn stub(&self, url_part: &str, status: u16, body: &str) {
        self.canned.lock().unwrap().push((
            url_part.to_string(),
            HttpResponse {
                status_code: status,
                headers: HashMap::new(),
                body: body.as_bytes().to_vec(),
            },
        ));
    }

    /// When set, every call fails at the transport level.
    pub(crate) fn fail_all(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_matching(&self, url_part: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.url.contains(url_part))
            .count()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused"));
        }
        self.calls.lock().unwrap().push(request.clone());
        for (part, response) in self.canned.lock().unwrap().iter() {
            if request.url.contains(part) {
                return Ok(response.clone());
            }
        }
        Ok(HttpResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: b"{}".to_vec(),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifications {
    pub(crate) statuses: Mutex<Vec<(String, String)>>,
}

impl NotificationProvider for RecordingNotifications {
    fn add_status(&self, title_key: &str, body: &str) {
        self.statuses
            .lock()
            .unwrap()
            .push((title_key.to_string(), body.to_string()));
    }
}

/// Echoes the key back, with arguments appended.
pub(crate) struct KeyTranslations;

impl TranslationProvider for KeyTranslations {
    fn translate(&self, key: &str, args: &[&str]) -> String {
        if args.is_empty() {
            key.to_string()
        } else {
            format!("{key}: {}", args.join(", "))
        }
    }
}

pub(crate) struct NoStatus;

impl StatusUpdateProvider for NoStatus {
    fn get_status(&self) -> Option<Request> {
        None
    }
}

pub(crate) struct Consenting(pub(crate) bool);

#[async_trait]
impl ConsentPrompt for Consenting {
    async fn request_consent(&self) -> bool {
        self.0
    }
}

pub(crate) struct StaticProof;

#[async_trait]
impl GameSessionProof for StaticProof {
    async fn prove(&self, _profile: &Profile) -> Result<String> {
        Ok("server-id-proof".to_string())
    }
}

pub(crate) fn test_profile() -> Profile {
    Profile::new(TEST_UUID, "tester")
}

fn build_client(
    consent: Consent,
    prompt_answer: bool,
    status_provider: Arc<dyn StatusUpdateProvider>,
    notifications: Arc<RecordingNotifications>,
) -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<MockSocketFactory>,
) {
    let http = Arc::new(RecordingHttpClient::new());
    let sockets = Arc::new(MockSocketFactory::new());
    let config = Arc::new(ApiConfig::new(
        "http://api.test/v1",
        "ws://api.test/v1/gateway",
    ));
    config.set_privacy(consent);
    let client = ApiClient::new(
        http.clone(),
        sockets.clone(),
        config,
        notifications,
        Arc::new(KeyTranslations),
        status_provider,
        Arc::new(Consenting(prompt_answer)),
        Arc::new(StaticProof),
    );
    (client, http, sockets)
}

pub(crate) async fn test_client() -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<MockSocketFactory>,
) {
    build_client(
        Consent::Accepted,
        true,
        Arc::new(NoStatus),
        Arc::new(RecordingNotifications::default()),
    )
}

pub(crate) async fn test_client_with(
    consent: Consent,
    prompt_answer: bool,
) -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<MockSocketFactory>,
) {
    build_client(
        consent,
        prompt_answer,
        Arc::new(NoStatus),
        Arc::new(RecordingNotifications::default()),
    )
}

/// Login/account stubs good enough for a full startup round trip.
pub(crate) fn stub_login(http: &RecordingHttpClient) {
    http.stub("/authenticate", 200, r#"{"access_token":"token-1"}"#);
    http.stub("/account/settings", 200, r#"{"show_activity":true}"#);
    http.stub(
        "/account",
        200,
        r#"{"uuid":"1234567890abcdef1234567890abcdef","name":"tester"}"#,
    );
}

pub(crate) async fn authenticated_client() -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<MockSocketFactory>,
) {
    let (client, http, sockets) = test_client().await;
    stub_login(&http);
    client.startup(test_profile()).await;
    assert!(client.is_connected().await, "fixture login did not connect");
    (client, http, sockets)
}

pub(crate) async fn authenticated_client_with_provider(
    status_provider: Arc<dyn StatusUpdateProvider>,
) -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<MockSocketFactory>,
) {
    let (client, http, sockets) = build_client(
        Consent::Accepted,
        true,
        status_provider,
        Arc::new(RecordingNotifications::default()),
    );
    stub_login(&http);
    client.startup(test_profile()).await;
    assert!(client.is_connected().await, "fixture login did not connect");
    (client, http, sockets)
}

/// Like `authenticated_client`, additionally exposing the recorded
/// notifications.
pub(crate) async fn authenticated_client_with_notifications() -> (
    Arc<ApiClient>,
    Arc<RecordingHttpClient>,
    Arc<RecordingNotifications>,
) {
    let notifications = Arc::new(RecordingNotifications::default());
    let (client, http, _) = build_client(
        Consent::Accepted,
        true,
        Arc::new(NoStatus),
        notifications.clone(),
    );
    stub_login(&http);
    client.startup(test_profile()).await;
    assert!(client.is_connected().await, "fixture login did not connect");
    (client, http, notifications)
}

/// Polls until the condition holds; panics after ~1s of simulated waiting.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
