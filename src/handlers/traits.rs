use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ApiClient;
use crate::response::Response;

/// A subsystem claiming responsibility for a subset of push message types.
///
/// Inbound push frames carry a `target` field naming their type; the
/// router asks each registered handler in order and hands the frame to the
/// first one whose predicate matches.
#[async_trait]
pub trait PushHandler: Send + Sync {
    /// Whether this handler claims the given target tag.
    fn matches(&self, target: &str) -> bool;

    /// Acts on a frame this handler claimed.
    async fn handle(&self, client: &Arc<ApiClient>, message: &Response);
}
