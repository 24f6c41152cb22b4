use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::traits::PushHandler;
use crate::client::ApiClient;
use crate::response::Response;

/// Inbound friend requests surface as notifications; acting on them is the
/// UI's business.
pub struct FriendRequestHandler;

#[async_trait]
impl PushHandler for FriendRequestHandler {
    fn matches(&self, target: &str) -> bool {
        target == "friend_request"
    }

    async fn handle(&self, client: &Arc<ApiClient>, message: &Response) {
        let from = message.body_str("from").unwrap_or_default().to_string();
        let name = match client.get_user(&from).await {
            Some(user) => user.name,
            None => from,
        };
        debug!(target: "api::friends", "friend request from {name}");
        let body = client
            .translations
            .translate("api.friends.request", &[&name]);
        client
            .notifications
            .add_status("api.notification.friends", &body);
    }
}

/// Reaction to a previously sent friend request (accepted or declined).
pub struct FriendRequestReactionHandler;

#[async_trait]
impl PushHandler for FriendRequestReactionHandler {
    fn matches(&self, target: &str) -> bool {
        target == "friend_request_reaction"
    }

    async fn handle(&self, client: &Arc<ApiClient>, message: &Response) {
        let from = message.body_str("from").unwrap_or_default().to_string();
        let accepted = message
            .body_field("accepted")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let name = match client.get_user(&from).await {
            Some(user) => user.name,
            None => from,
        };
        let key = if accepted {
            "api.friends.accepted"
        } else {
            "api.friends.declined"
        };
        let body = client.translations.translate(key, &[&name]);
        client
            .notifications
            .add_status("api.notification.friends", &body);
    }
}
