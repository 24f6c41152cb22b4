use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, warn};
use serde_json::Value;

use super::traits::PushHandler;
use crate::client::ApiClient;
use crate::request::Route;
use crate::response::{Response, parse_timestamp};
use crate::types::{Channel, ChatMessage, User};

pub const CHAT_MESSAGE_TARGET: &str = "chat_message";

type MessageConsumer = Box<dyn Fn(ChatMessage) + Send + Sync>;
type MessagesConsumer = Box<dyn Fn(Vec<ChatMessage>) + Send + Sync>;
type NotificationsEnabler = Box<dyn Fn(&ChatMessage) -> bool + Send + Sync>;

/// Swap-in chat callbacks. Exactly one consumer of each kind is active;
/// the latest registration wins and there is no unsubscribe.
pub(crate) struct ChatCallbacks {
    message_consumer: Mutex<MessageConsumer>,
    messages_consumer: Mutex<MessagesConsumer>,
    notifications_enabled: Mutex<NotificationsEnabler>,
}

impl Default for ChatCallbacks {
    fn default() -> Self {
        Self {
            message_consumer: Mutex::new(Box::new(|_| {})),
            messages_consumer: Mutex::new(Box::new(|_| {})),
            notifications_enabled: Mutex::new(Box::new(|_| true)),
        }
    }
}

impl ChatCallbacks {
    pub(crate) fn deliver(&self, message: ChatMessage) {
        (self.message_consumer.lock().unwrap())(message);
    }

    pub(crate) fn deliver_batch(&self, messages: Vec<ChatMessage>) {
        (self.messages_consumer.lock().unwrap())(messages);
    }

    pub(crate) fn allows_notification(&self, message: &ChatMessage) -> bool {
        (self.notifications_enabled.lock().unwrap())(message)
    }
}

/// Handler for inbound `chat_message` push frames.
pub struct ChatMessageHandler;

#[async_trait]
impl PushHandler for ChatMessageHandler {
    fn matches(&self, target: &str) -> bool {
        target == CHAT_MESSAGE_TARGET
    }

    async fn handle(&self, client: &Arc<ApiClient>, message: &Response) {
        let received = Utc::now();
        let Some(channel_id) = channel_id_field(message, "channel") else {
            error!(target: "api::chat", "chat push without channel id, dropping");
            return;
        };
        let sender_uuid = message.body_str("sender").unwrap_or_default().to_string();
        let sender_name = message
            .body_str("sender_name")
            .unwrap_or_default()
            .to_string();
        let content = message.body_str("content").unwrap_or_default().to_string();

        let sender = client
            .get_user(&sender_uuid)
            .await
            .unwrap_or_else(|| User::new(sender_uuid, sender_name.clone()));

        let chat_message = ChatMessage {
            channel_id,
            sender,
            sender_display_name: sender_name,
            content,
            timestamp: received,
        };

        if client.chat.allows_notification(&chat_message) {
            let title = client
                .translations
                .translate("api.chat.newMessageFrom", &[&chat_message.sender.name]);
            client.notifications.add_status(&title, &chat_message.content);
        }
        client.chat.deliver(chat_message);
    }
}

/// Channel ids arrive as strings or unsigned numbers depending on the
/// endpoint; normalize both to the string form.
fn channel_id_field(message: &Response, path: &str) -> Option<String> {
    message.body_with(path, |value| match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => id.as_u64().map(|id| id.to_string()),
        _ => None,
    })
}

impl ApiClient {
    /// Posts a message to a channel and echoes it locally right away.
    ///
    /// The echo is optimistic: the consumer sees the message before the
    /// network post settles, and the echoed copy is never reconciled with
    /// the server-confirmed one.
    pub async fn send_chat_message(self: &Arc<Self>, channel: &Channel, content: &str) {
        let Some(self_user) = self.self_user().await else {
            warn!(target: "api::chat", "cannot send message, no session user");
            return;
        };
        let display_name = self_user.display_name_for(content);

        let request = Route::Channel
            .builder()
            .path(&channel.id)
            .field("content", content)
            .field("display_name", display_name.as_str())
            .build();
        let client = self.clone();
        tokio::spawn(async move {
            match client.post(request).await {
                Ok(response) if response.is_error() => {
                    warn!(
                        target: "api::chat",
                        "sending message failed: {}",
                        response.error_description()
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(target: "api::chat", "sending message rejected: {e}"),
            }
        });

        self.chat.deliver(ChatMessage {
            channel_id: channel.id.clone(),
            sender: self_user,
            sender_display_name: display_name,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Fetches the page of messages older than `before_epoch_secs` and
    /// hands the whole batch to the messages consumer.
    pub async fn get_messages_before(self: &Arc<Self>, channel: &Channel, before_epoch_secs: i64) {
        let Some(before) = DateTime::from_timestamp(before_epoch_secs, 0) else {
            warn!(target: "api::chat", "invalid history cursor: {before_epoch_secs}");
            return;
        };
        let request = Route::Channel
            .builder()
            .path(&channel.id)
            .path("messages")
            .query("before", before.to_rfc3339_opts(SecondsFormat::Secs, true))
            .build();

        let response = match self.get(request).await {
            Ok(response) if !response.is_error() => response,
            Ok(response) => {
                warn!(
                    target: "api::chat",
                    "history fetch failed: {}",
                    response.error_description()
                );
                return;
            }
            Err(e) => {
                warn!(target: "api::chat", "history fetch rejected: {e}");
                return;
            }
        };

        let Some(records) = response.body_json().and_then(Value::as_array).cloned() else {
            warn!(target: "api::chat", "history response is not a message list");
            return;
        };

        let mut messages = Vec::with_capacity(records.len());
        for record in &records {
            if let Some(message) = self.deserialize_history_record(record).await {
                messages.push(message);
            }
        }
        // Stable sort: arrival order breaks timestamp ties.
        messages.sort_by_key(|message| message.timestamp);
        self.chat.deliver_batch(messages);
    }

    async fn deserialize_history_record(self: &Arc<Self>, record: &Value) -> Option<ChatMessage> {
        let channel_id = match record.get("channel_id")? {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.as_u64()?.to_string(),
            _ => return None,
        };
        let sender_uuid = record.get("sender")?.as_str()?.to_string();
        let sender_name = record
            .get("sender_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let content = record.get("content")?.as_str()?.to_string();
        let timestamp = parse_timestamp(record.get("timestamp")?)?;
        let sender = self
            .get_user(&sender_uuid)
            .await
            .unwrap_or_else(|| User::new(sender_uuid, sender_name.clone()));
        Some(ChatMessage {
            channel_id,
            sender,
            sender_display_name: sender_name,
            content,
            timestamp,
        })
    }

    /// Replaces the single-message consumer. The previous one is gone for
    /// good; last registration wins.
    pub fn set_message_consumer(&self, consumer: impl Fn(ChatMessage) + Send + Sync + 'static) {
        *self.chat.message_consumer.lock().unwrap() = Box::new(consumer);
    }

    /// Replaces the history-batch consumer.
    pub fn set_messages_consumer(
        &self,
        consumer: impl Fn(Vec<ChatMessage>) + Send + Sync + 'static,
    ) {
        *self.chat.messages_consumer.lock().unwrap() = Box::new(consumer);
    }

    /// Replaces the predicate gating chat notifications.
    pub fn set_notifications_enabled(
        &self,
        predicate: impl Fn(&ChatMessage) -> bool + Send + Sync + 'static,
    ) {
        *self.chat.notifications_enabled.lock().unwrap() = Box::new(predicate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn send_message_echoes_locally_before_the_post_settles() {
        let (client, _http, _) = authenticated_client().await;
        let received: Arc<Mutex<Vec<ChatMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_message_consumer(move |message| sink.lock().unwrap().push(message));

        let channel = Channel::new("42", "general");
        client.send_chat_message(&channel, "hi").await;

        // The echo must have landed already, whether or not the post is
        // still in flight.
        let self_uuid = client.self_user().await.unwrap().uuid;
        let messages = received.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[0].channel_id, "42");
        assert_eq!(messages[0].sender.uuid, self_uuid);
    }

    #[tokio::test]
    async fn send_message_without_session_user_is_dropped() {
        let (client, _, _) = test_client().await;
        let received: Arc<Mutex<Vec<ChatMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.set_message_consumer(move |message| sink.lock().unwrap().push(message));

        client
            .send_chat_message(&Channel::new("42", "general"), "hi")
            .await;
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_batch_is_sorted_and_delivered_once() {
        let (client, http, _) = authenticated_client().await;
        http.stub(
            "/channel/42/messages",
            200,
            r#"[
                {"channel_id":42,"sender":"1234567890abcdef1234567890abcdef","sender_name":"a","content":"second","timestamp":"2024-05-01T12:00:01Z"},
                {"channel_id":42,"sender":"1234567890abcdef1234567890abcdef","sender_name":"a","content":"first","timestamp":"2024-05-01T12:00:00Z"}
            ]"#,
        );
        let batches: Arc<Mutex<Vec<Vec<ChatMessage>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = batches.clone();
        client.set_messages_consumer(move |batch| sink.lock().unwrap().push(batch));

        client
            .get_messages_before(&Channel::new("42", "general"), 1714567200)
            .await;

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let contents: Vec<&str> = batches[0].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[tokio::test]
    async fn inbound_notifications_respect_the_predicate() {
        let (client, _http, notifications) = authenticated_client_with_notifications().await;
        client.set_notifications_enabled(|message| message.content.contains("ping"));

        client
            .dispatch_push(
                r#"{"target":"chat_message","channel":1,"sender":"1234567890abcdef1234567890abcdef","sender_name":"tester","content":"hello"}"#,
            )
            .await;
        client
            .dispatch_push(
                r#"{"target":"chat_message","channel":1,"sender":"1234567890abcdef1234567890abcdef","sender_name":"tester","content":"ping me"}"#,
            )
            .await;

        let statuses = notifications.statuses.lock().unwrap();
        // Only the ping got a toast; login notifications are gated off by
        // default detailed logging.
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].1.contains("ping"));
    }

    #[tokio::test]
    async fn last_consumer_registration_wins() {
        let (client, _, _) = authenticated_client().await;
        let first: Arc<Mutex<Vec<ChatMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let second: Arc<Mutex<Vec<ChatMessage>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = first.clone();
        client.set_message_consumer(move |message| sink.lock().unwrap().push(message));
        let sink = second.clone();
        client.set_message_consumer(move |message| sink.lock().unwrap().push(message));

        client
            .send_chat_message(&Channel::new("42", "general"), "hi")
            .await;
        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }
}
