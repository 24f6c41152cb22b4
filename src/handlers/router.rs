use std::sync::Arc;

use super::traits::PushHandler;
use crate::client::ApiClient;
use crate::response::Response;

/// Ordered registry of push-message handlers.
///
/// The list is fixed at session construction. Dispatch walks it in order
/// and invokes the FIRST handler whose predicate matches, so exactly one
/// handler sees any given frame. Unmatched frames are dropped by the
/// caller; unknown targets are expected from newer backends.
pub struct PushRouter {
    handlers: Vec<Arc<dyn PushHandler>>,
}

impl PushRouter {
    pub fn new(handlers: Vec<Arc<dyn PushHandler>>) -> Self {
        Self { handlers }
    }

    /// Number of registered handlers (useful for testing).
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches a frame to the first matching handler.
    ///
    /// Returns `false` when no handler claimed the target.
    pub async fn dispatch(
        &self,
        client: &Arc<ApiClient>,
        target: &str,
        message: &Response,
    ) -> bool {
        for handler in &self.handlers {
            if handler.matches(target) {
                handler.handle(client, message).await;
                return true;
            }
        }
        false
    }
}
