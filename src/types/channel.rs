use serde::Deserialize;

/// A chat channel (direct message or group).
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// UUIDs of the members, owner included.
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            participants: Vec::new(),
        }
    }
}
