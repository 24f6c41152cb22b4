use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub const API_URL: &str = "https://api.axolotlclient.com/v1";
pub const SOCKET_URL: &str = "wss://api.axolotlclient.com/v1/gateway";

const DEFAULT_STATUS_UPDATE_INTERVAL_SECS: u64 = 30;

/// Answer to the privacy notice shown before the first session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Unset,
    Accepted,
    Denied,
}

/// Runtime-adjustable configuration surface of the session layer.
///
/// Flags are atomics so a running session observes changes without a
/// restart; persistence of the values is the embedder's concern.
#[derive(Debug)]
pub struct ApiConfig {
    base_url: String,
    socket_url: String,
    enabled: AtomicBool,
    detailed_logging: AtomicBool,
    privacy: Mutex<Consent>,
    status_update_interval_secs: AtomicU64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, socket_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            socket_url: socket_url.into(),
            enabled: AtomicBool::new(true),
            detailed_logging: AtomicBool::new(false),
            privacy: Mutex::new(Consent::Unset),
            status_update_interval_secs: AtomicU64::new(DEFAULT_STATUS_UPDATE_INTERVAL_SECS),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn socket_url(&self) -> &str {
        &self.socket_url
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn detailed_logging(&self) -> bool {
        self.detailed_logging.load(Ordering::Relaxed)
    }

    pub fn set_detailed_logging(&self, detailed: bool) {
        self.detailed_logging.store(detailed, Ordering::Relaxed);
    }

    pub fn privacy(&self) -> Consent {
        *self.privacy.lock().unwrap()
    }

    pub fn set_privacy(&self, consent: Consent) {
        *self.privacy.lock().unwrap() = consent;
    }

    pub fn status_update_interval(&self) -> Duration {
        Duration::from_secs(self.status_update_interval_secs.load(Ordering::Relaxed))
    }

    pub fn set_status_update_interval_secs(&self, secs: u64) {
        self.status_update_interval_secs.store(secs, Ordering::Relaxed);
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(API_URL, SOCKET_URL)
    }
}
