//! The push channel: a single long-lived websocket over which the backend
//! delivers unsolicited events. The trait pair keeps the session logic off
//! the wire so tests can drive it with scripted events.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const EVENT_BUFFER: usize = 100;

/// An event produced by the push channel.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// The channel is open and authenticated.
    Connected,
    /// A text frame arrived from the backend.
    MessageReceived(String),
    /// The connection was closed, by either side.
    Closed,
}

/// An open push channel.
#[async_trait]
pub trait SocketHandle: Send + Sync {
    /// Sends a text frame to the backend.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Sends a normal-closure frame; no-op when already closed.
    async fn close(&self);
}

/// Creates push channels, authenticating the upgrade with the bearer token.
#[async_trait]
pub trait SocketFactory: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> Result<(Arc<dyn SocketHandle>, mpsc::Receiver<SocketEvent>)>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Tokio/tungstenite-backed push channel.
pub struct TungsteniteSocket {
    sink: Mutex<Option<WsSink>>,
}

#[async_trait]
impl SocketHandle for TungsteniteSocket {
    async fn send_text(&self, text: &str) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("socket is closed"))?;
        sink.send(Message::text(text))
            .await
            .map_err(|e| anyhow::anyhow!("websocket send error: {e}"))
    }

    async fn close(&self) {
        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            let _ = sink.send(Message::Close(Some(frame))).await;
        }
    }
}

#[derive(Default)]
pub struct TungsteniteSocketFactory;

impl TungsteniteSocketFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SocketFactory for TungsteniteSocketFactory {
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> Result<(Arc<dyn SocketHandle>, mpsc::Receiver<SocketEvent>)> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(token)?);

        info!(target: "api::socket", "dialing {url}");
        let (stream, _response) = connect_async(request).await?;
        let (sink, source) = stream.split();

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(read_pump(source, event_tx.clone()));
        let _ = event_tx.send(SocketEvent::Connected).await;

        let socket = Arc::new(TungsteniteSocket {
            sink: Mutex::new(Some(sink)),
        });
        Ok((socket, event_rx))
    }
}

async fn read_pump(mut source: WsSource, event_tx: mpsc::Sender<SocketEvent>) {
    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => {
                trace!(target: "api::socket", "<-- frame: {} bytes", text.len());
                if event_tx
                    .send(SocketEvent::MessageReceived(text.as_str().to_string()))
                    .await
                    .is_err()
                {
                    warn!(target: "api::socket", "event receiver dropped, closing read pump");
                    return;
                }
            }
            Ok(Message::Close(_)) => {
                trace!(target: "api::socket", "received close frame");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(target: "api::socket", "error reading from websocket: {e}");
                break;
            }
        }
    }
    let _ = event_tx.send(SocketEvent::Closed).await;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A socket that records sent frames and never touches the network.
    #[derive(Default)]
    pub struct MockSocket {
        pub sent: std::sync::Mutex<Vec<String>>,
        pub closed: AtomicUsize,
    }

    #[async_trait]
    impl SocketHandle for MockSocket {
        async fn send_text(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Factory handing out mock sockets; keeps the event sender of the most
    /// recent connection around so tests can script frames and closures.
    #[derive(Default)]
    pub struct MockSocketFactory {
        pub connects: AtomicUsize,
        pub event_tx: std::sync::Mutex<Option<mpsc::Sender<SocketEvent>>>,
        pub last_socket: std::sync::Mutex<Option<Arc<MockSocket>>>,
    }

    impl MockSocketFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        pub async fn push_event(&self, event: SocketEvent) {
            let tx = self.event_tx.lock().unwrap().clone();
            if let Some(tx) = tx {
                let _ = tx.send(event).await;
            }
        }
    }

    #[async_trait]
    impl SocketFactory for MockSocketFactory {
        async fn connect(
            &self,
            _url: &str,
            _token: &str,
        ) -> Result<(Arc<dyn SocketHandle>, mpsc::Receiver<SocketEvent>)> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let (event_tx, event_rx) = mpsc::channel(16);
            let _ = event_tx.send(SocketEvent::Connected).await;
            *self.event_tx.lock().unwrap() = Some(event_tx);
            let socket = Arc::new(MockSocket::default());
            *self.last_socket.lock().unwrap() = Some(socket.clone());
            Ok((socket, event_rx))
        }
    }
}
