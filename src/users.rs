use std::sync::Arc;

use dashmap::DashMap;
use log::{error, warn};

use crate::client::ApiClient;
use crate::request::Route;
use crate::types::{Status, User, sanitize_uuid};

/// Cached user profiles keyed by sanitized UUID.
#[derive(Default)]
pub(crate) struct UserCache {
    users: DashMap<String, User>,
}

impl UserCache {
    pub(crate) fn get(&self, uuid: &str) -> Option<User> {
        self.users.get(uuid).map(|user| user.clone())
    }

    pub(crate) fn insert(&self, user: User) {
        self.users.insert(user.uuid.clone(), user);
    }

    pub(crate) fn update_status(&self, uuid: &str, status: Status) {
        if let Some(mut user) = self.users.get_mut(uuid) {
            user.status = status;
        }
    }
}

impl ApiClient {
    /// Cached asynchronous profile lookup.
    ///
    /// A UUID that does not sanitize is a corrupted identity and is
    /// rejected without a lookup.
    pub async fn get_user(self: &Arc<Self>, uuid: &str) -> Option<User> {
        let uuid = match sanitize_uuid(uuid) {
            Ok(uuid) => uuid,
            Err(e) => {
                error!(target: "api", "rejecting user lookup: {e}");
                return None;
            }
        };
        if let Some(user) = self.users.get(&uuid) {
            return Some(user);
        }

        let request = Route::User.builder().path(&uuid).build();
        match self.get(request).await {
            Ok(response) if !response.is_error() => {
                match serde_json::from_slice::<User>(response.raw_body()) {
                    Ok(user) => {
                        self.users.insert(user.clone());
                        Some(user)
                    }
                    Err(e) => {
                        warn!(target: "api", "malformed user record for {uuid}: {e}");
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(
                    target: "api",
                    "user lookup for {uuid} failed: {}",
                    response.error_description()
                );
                None
            }
            Err(e) => {
                warn!(target: "api", "user lookup for {uuid} rejected: {e}");
                None
            }
        }
    }
}
