use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::traits::PushHandler;
use crate::client::ApiClient;
use crate::response::Response;
use crate::types::Status;

/// Applies `status_update` pushes to the cached profile of the affected
/// user. Profiles we never looked up are left alone; they will carry the
/// fresh status when first fetched.
pub struct StatusUpdateHandler;

#[async_trait]
impl PushHandler for StatusUpdateHandler {
    fn matches(&self, target: &str) -> bool {
        target == "status_update"
    }

    async fn handle(&self, client: &Arc<ApiClient>, message: &Response) {
        let Some(uuid) = message.body_str("user") else {
            debug!(target: "api::status", "status update without user field, dropping");
            return;
        };
        let status = message
            .body_field("status")
            .and_then(|value| serde_json::from_value::<Status>(value.clone()).ok())
            .unwrap_or_default();
        client.users.update_status(uuid, status);
    }
}
