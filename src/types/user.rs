use serde::Deserialize;

use super::system::System;
use crate::error::ClientError;

/// Identity of the locally running game profile, as handed to `startup`.
#[derive(Debug, Clone)]
pub struct Profile {
    pub uuid: String,
    pub name: String,
    /// Offline-mode profiles cannot authenticate and never start a session.
    pub offline: bool,
}

impl Profile {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            offline: false,
        }
    }
}

/// Presence of a user as reported by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub activity: Option<Activity>,
}

/// In-game context attached to an online status.
#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub started: Option<chrono::DateTime<chrono::Utc>>,
}

/// A backend user record.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: Status,
    /// Linked alternate identity messages may be proxied through.
    #[serde(skip)]
    pub system: Option<System>,
}

impl User {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            display_name: None,
            status: Status::default(),
            system: None,
        }
    }

    /// Display name to attach when sending `message`.
    ///
    /// When a system identity is linked, the fronting member claiming the
    /// message supplies the name; otherwise the explicit display-name
    /// override or the account name is used.
    pub fn display_name_for(&self, message: &str) -> String {
        if let Some(system) = &self.system
            && let Some(member) = system.proxy_for(message)
        {
            return member.display_name.clone();
        }
        self.display_name
            .clone()
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Per-account settings fetched once at login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSettings {
    #[serde(default)]
    pub show_registered: bool,
    #[serde(default)]
    pub retain_usernames: bool,
    #[serde(default)]
    pub show_last_online: bool,
    #[serde(default)]
    pub show_activity: bool,
    #[serde(default)]
    pub allow_friend_requests: bool,
}

/// Normalizes a UUID to its undashed 32-hex-char form.
///
/// Anything that does not strip down to exactly 32 hex characters is
/// rejected hard; a bad value here means a corrupted identity, not a
/// formatting preference.
pub fn sanitize_uuid(uuid: &str) -> Result<String, ClientError> {
    let stripped: String = uuid.chars().filter(|c| *c != '-').collect();
    if stripped.len() != 32 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ClientError::MalformedUuid(uuid.to_string()));
    }
    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::system::{Member, ProxyTag};

    #[test]
    fn undashed_uuid_passes_through() {
        let uuid = "1234567890abcdef1234567890abcdef";
        assert_eq!(sanitize_uuid(uuid).unwrap(), uuid);
    }

    #[test]
    fn dashed_uuid_is_stripped() {
        assert_eq!(
            sanitize_uuid("12345678-90ab-cdef-1234-567890abcdef").unwrap(),
            "1234567890abcdef1234567890abcdef"
        );
    }

    #[test]
    fn short_uuid_is_rejected() {
        assert!(sanitize_uuid("abc").is_err());
    }

    #[test]
    fn non_hex_uuid_is_rejected() {
        assert!(sanitize_uuid("z234567890abcdef1234567890abcdef").is_err());
    }

    #[test]
    fn display_name_prefers_system_proxy() {
        let mut user = User::new("1234567890abcdef1234567890abcdef", "moehreag");
        user.display_name = Some("Moe".to_string());
        assert_eq!(user.display_name_for("hello"), "Moe");

        user.system = Some(System {
            id: "abcde".to_string(),
            name: "Example System".to_string(),
            fronters: vec![Member {
                id: "fghij".to_string(),
                display_name: "Fronter".to_string(),
                proxy_tags: vec![ProxyTag {
                    prefix: "f:".to_string(),
                    suffix: String::new(),
                }],
            }],
        });
        assert_eq!(user.display_name_for("f: hello"), "Fronter");
    }
}
