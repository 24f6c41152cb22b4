use thiserror::Error;

/// Errors surfaced by the session layer.
///
/// Transport-level failures during a request do NOT show up here; they are
/// converted into the client-error sentinel [`crate::Response`]. The only
/// failure a request caller has to handle as an `Err` is the pre-flight
/// [`ClientError::NotAuthenticated`] rejection.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client is not authenticated")]
    NotAuthenticated,
    #[error("no identity stored")]
    NoIdentity,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("malformed uuid: {0:?}")]
    MalformedUuid(String),
    #[error("malformed push frame: {0}")]
    MalformedFrame(String),
    #[error("socket error: {0}")]
    Socket(#[from] anyhow::Error),
}
