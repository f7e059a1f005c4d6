//! Error taxonomy shared by the polling, evaluation and query paths.

use reqwest::StatusCode;

/// Failure of a single monitoring operation.
///
/// Every variant maps to a stable [`MonitorError::kind`] label so that logs
/// and API responses can be filtered by failure class without parsing the
/// message.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The token endpoint could not issue a credential.
    #[error("token issuance failed: {0}")]
    Auth(String),

    /// Network failure or timeout talking to the vendor API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The vendor API answered with a non-success status.
    #[error("vendor API returned {status}: {body}")]
    Remote { status: StatusCode, body: String },

    /// The vendor payload did not match the expected shape.
    #[error("malformed vendor payload: {0}")]
    Parse(String),

    /// The messaging webhook rejected or never received the alert.
    #[error("notification delivery failed: {0}")]
    Notify(String),

    /// Persistence failure in an append store or the credential blob.
    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Short label used as the `error_kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Auth(_) => "auth",
            MonitorError::Transport(_) => "transport",
            MonitorError::Remote { .. } => "remote",
            MonitorError::Parse(_) => "parse",
            MonitorError::Notify(_) => "notify",
            MonitorError::Store(_) => "store",
        }
    }

    /// Classify a reqwest failure raised while talking to the vendor API.
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MonitorError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            MonitorError::Remote {
                status,
                body: String::new(),
            }
        } else {
            MonitorError::Transport(e.to_string())
        }
    }
}

impl From<sqlx::Error> for MonitorError {
    fn from(e: sqlx::Error) -> Self {
        MonitorError::Store(e.to_string())
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(e: std::io::Error) -> Self {
        MonitorError::Store(e.to_string())
    }
}
