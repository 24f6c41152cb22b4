use chrono::{DateTime, Utc};

use super::user::User;

/// A chat message as delivered to consumers.
///
/// Messages within a channel are ordered by timestamp, arrival order
/// breaking ties. The timestamp is the local receipt (or send) time; the
/// locally echoed copy of an own message is never reconciled with the
/// server-confirmed one.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel_id: String,
    pub sender: User,
    pub sender_display_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
