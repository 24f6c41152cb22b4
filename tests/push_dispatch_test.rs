//! Dispatch semantics of the push router, exercised through the public
//! API with collaborators stubbed out in this file.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use axolotl_api::handlers::{PushHandler, PushRouter};
use axolotl_api::http::{HttpClient, HttpRequest, HttpResponse};
use axolotl_api::providers::{
    ConsentPrompt, GameSessionProof, NotificationProvider, StatusUpdateProvider,
    TranslationProvider,
};
use axolotl_api::socket::{SocketEvent, SocketFactory, SocketHandle};
use axolotl_api::types::Profile;
use axolotl_api::{ApiClient, ApiConfig, Request, Response};

struct NullHttp;

#[async_trait]
impl HttpClient for NullHttp {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: b"{}".to_vec(),
        })
    }
}

struct NullSocket;

#[async_trait]
impl SocketHandle for NullSocket {
    async fn send_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

struct NullSocketFactory;

#[async_trait]
impl SocketFactory for NullSocketFactory {
    async fn connect(
        &self,
        _url: &str,
        _token: &str,
    ) -> Result<(Arc<dyn SocketHandle>, mpsc::Receiver<SocketEvent>)> {
        let (_tx, rx) = mpsc::channel(1);
        Ok((Arc::new(NullSocket), rx))
    }
}

struct Silent;

impl NotificationProvider for Silent {
    fn add_status(&self, _title_key: &str, _body: &str) {}
}

impl TranslationProvider for Silent {
    fn translate(&self, key: &str, _args: &[&str]) -> String {
        key.to_string()
    }
}

impl StatusUpdateProvider for Silent {
    fn get_status(&self) -> Option<Request> {
        None
    }
}

#[async_trait]
impl ConsentPrompt for Silent {
    async fn request_consent(&self) -> bool {
        false
    }
}

#[async_trait]
impl GameSessionProof for Silent {
    async fn prove(&self, _profile: &Profile) -> Result<String> {
        Ok(String::new())
    }
}

fn stub_client() -> Arc<ApiClient> {
    ApiClient::new(
        Arc::new(NullHttp),
        Arc::new(NullSocketFactory),
        Arc::new(ApiConfig::new("http://t/v1", "ws://t/v1/gateway")),
        Arc::new(Silent),
        Arc::new(Silent),
        Arc::new(Silent),
        Arc::new(Silent),
        Arc::new(Silent),
    )
}

struct CountingHandler {
    tag: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PushHandler for CountingHandler {
    fn matches(&self, target: &str) -> bool {
        target == self.tag
    }

    async fn handle(&self, _client: &Arc<ApiClient>, _message: &Response) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn only_the_first_matching_handler_runs() {
    let _ = env_logger::builder().is_test(true).try_init();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let other = Arc::new(AtomicUsize::new(0));
    let router = PushRouter::new(vec![
        Arc::new(CountingHandler {
            tag: "chat_message",
            calls: first.clone(),
        }),
        Arc::new(CountingHandler {
            tag: "chat_message",
            calls: second.clone(),
        }),
        Arc::new(CountingHandler {
            tag: "friend_request",
            calls: other.clone(),
        }),
    ]);
    assert_eq!(router.handler_count(), 3);

    let client = stub_client();
    let frame = Response::from_frame(r#"{"target":"chat_message","content":"hi"}"#);
    assert!(router.dispatch(&client, "chat_message", &frame).await);

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
    assert_eq!(other.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unmatched_targets_fall_through() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = PushRouter::new(vec![Arc::new(CountingHandler {
        tag: "chat_message",
        calls: calls.clone(),
    })]);

    let client = stub_client();
    let frame = Response::from_frame(r#"{"target":"something_new"}"#);
    assert!(!router.dispatch(&client, "something_new", &frame).await);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn push_frames_expose_the_target_field() {
    let frame = Response::from_frame(r#"{"target":"status_update","user":"abc"}"#);
    assert_eq!(frame.body_str("target"), Some("status_update"));
    assert_eq!(frame.body_str("user"), Some("abc"));
}
