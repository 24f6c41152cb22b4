//! The authenticate flow: game-session proof in, live session out.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use log::{debug, info};

use crate::client::{ApiClient, SessionState};
use crate::error::ClientError;
use crate::request::Route;
use crate::types::{AccountSettings, User, sanitize_uuid};

impl ApiClient {
    /// Exchanges the game-session proof for a backend token, loads the
    /// account state, opens the push channel and spawns the background
    /// loops. Any failure leaves no partial state behind; the caller
    /// resets to `Unauthenticated`.
    pub(crate) async fn authenticate(self: &Arc<Self>) -> Result<(), ClientError> {
        let profile = self
            .identity
            .lock()
            .await
            .clone()
            .ok_or(ClientError::NoIdentity)?;
        let uuid = sanitize_uuid(&profile.uuid)?;
        debug!(target: "api", "authenticating as {}", profile.name);
        self.status_provider.initialize();

        let server_id = self
            .session_proof
            .prove(&profile)
            .await
            .map_err(|e| ClientError::AuthenticationFailed(e.to_string()))?;

        let login = Route::Authenticate
            .builder()
            .unauthenticated()
            .query("uuid", &uuid)
            .query("username", &profile.name)
            .query("server_id", &server_id)
            .build();
        let response = self.post(login).await?;
        if response.is_error() {
            return Err(ClientError::AuthenticationFailed(
                response.error_description(),
            ));
        }
        let token = response
            .body_str("access_token")
            .ok_or_else(|| {
                ClientError::AuthenticationFailed("login response without access token".to_string())
            })?
            .to_string();

        self.conn.lock().await.token = Some(token.clone());
        *self.state.lock().await = SessionState::Authenticated;

        // Self profile and settings load together.
        let (profile_response, settings_response) = tokio::join!(
            self.get(Route::Account.builder().build()),
            self.get(Route::AccountSettings.builder().build()),
        );
        let user = profile_response
            .ok()
            .filter(|response| !response.is_error())
            .and_then(|response| serde_json::from_slice::<User>(response.raw_body()).ok())
            .ok_or_else(|| {
                ClientError::AuthenticationFailed("could not load account profile".to_string())
            })?;
        let settings = settings_response
            .ok()
            .filter(|response| !response.is_error())
            .and_then(|response| {
                serde_json::from_slice::<AccountSettings>(response.raw_body()).ok()
            })
            .unwrap_or_default();

        self.users.insert(user.clone());
        *self.self_user.write().await = Some(user);
        *self.settings.write().await = settings;

        // Bump the generation before the old channel can observe its own
        // teardown; loops of the previous connection go stale right here.
        let generation = self.connection_generation.fetch_add(1, Ordering::SeqCst) + 1;

        *self.state.lock().await = SessionState::Connecting;
        let (socket, events) = self
            .socket_factory
            .connect(self.config.socket_url(), &token)
            .await?;
        self.conn.lock().await.socket = Some(socket);
        *self.state.lock().await = SessionState::Connected;

        self.expected_disconnect.store(false, Ordering::SeqCst);
        self.reconnect_failures.store(0, Ordering::SeqCst);

        info!(target: "api", "session connected as {}", profile.name);
        if self.config.detailed_logging() {
            let body = self.translations.translate("api.success.handshake", &[]);
            self.notifications.add_status("api.success.handshake", &body);
        }

        let client = self.clone();
        tokio::spawn(client.socket_loop(events, generation));
        let client = self.clone();
        tokio::spawn(client.status_update_loop(generation));
        Ok(())
    }
}
