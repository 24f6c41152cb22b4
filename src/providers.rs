//! Collaborator interfaces the session layer consumes but does not
//! implement. The game client supplies these; tests stub them.

use crate::request::Request;
use crate::types::Profile;
use async_trait::async_trait;

/// Surfaces user-visible toasts ("new message from ...", handshake results).
pub trait NotificationProvider: Send + Sync {
    fn add_status(&self, title_key: &str, body: &str);
}

/// Resolves translation keys against the game's language files.
pub trait TranslationProvider: Send + Sync {
    fn translate(&self, key: &str, args: &[&str]) -> String;
}

/// Produces the periodic presence report.
///
/// `get_status` returning `None` means there is nothing new to report and
/// no request is posted this round.
pub trait StatusUpdateProvider: Send + Sync {
    fn initialize(&self) {}

    fn get_status(&self) -> Option<Request>;
}

/// Asks the user the privacy question before the first session.
///
/// The future resolves once the user answered; the session layer persists
/// the answer into its configuration.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn request_consent(&self) -> bool;
}

/// Proves possession of the game session to the backend.
///
/// The returned proof string is handed to the authenticate route as the
/// `server_id` parameter; how it is obtained (the session-server join
/// dance) stays outside this crate.
#[async_trait]
pub trait GameSessionProof: Send + Sync {
    async fn prove(&self, profile: &Profile) -> anyhow::Result<String>;
}
