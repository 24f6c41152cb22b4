pub mod channel;
pub mod message;
pub mod system;
pub mod user;

pub use channel::Channel;
pub use message::ChatMessage;
pub use system::{Member, ProxyTag, System};
pub use user::{AccountSettings, Profile, Status, User, sanitize_uuid};
