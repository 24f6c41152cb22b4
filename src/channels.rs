use std::sync::Arc;

use log::warn;

use crate::client::ApiClient;
use crate::request::Route;
use crate::types::Channel;

impl ApiClient {
    /// All channels the session user participates in.
    pub async fn get_channels(self: &Arc<Self>) -> Vec<Channel> {
        match self.get(Route::Channels.builder().build()).await {
            Ok(response) if !response.is_error() => {
                serde_json::from_slice(response.raw_body()).unwrap_or_else(|e| {
                    warn!(target: "api", "malformed channel list: {e}");
                    Vec::new()
                })
            }
            Ok(response) => {
                warn!(
                    target: "api",
                    "channel list fetch failed: {}",
                    response.error_description()
                );
                Vec::new()
            }
            Err(e) => {
                warn!(target: "api", "channel list fetch rejected: {e}");
                Vec::new()
            }
        }
    }

    /// A single channel by id.
    pub async fn get_channel(self: &Arc<Self>, id: &str) -> Option<Channel> {
        match self.get(Route::Channel.builder().path(id).build()).await {
            Ok(response) if !response.is_error() => {
                serde_json::from_slice(response.raw_body()).ok()
            }
            Ok(response) => {
                warn!(
                    target: "api",
                    "channel {id} fetch failed: {}",
                    response.error_description()
                );
                None
            }
            Err(e) => {
                warn!(target: "api", "channel {id} fetch rejected: {e}");
                None
            }
        }
    }
}
