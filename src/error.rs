//! Error taxonomy shared by the backend client and the list screens.
//!
//! Every failure a screen can observe collapses into one of four kinds.
//! Screens only care about one distinction: [`ClientError::Unauthorized`]
//! forces navigation away, everything else is shown as a transient message
//! while the data already on screen stays untouched.

use thiserror::Error;

/// Failure outcome of a backend call or a local validation step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required field was missing or out of range before anything was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Connectivity problem or timeout talking to the backend.
    #[error("network failure: {0}")]
    Network(String),

    /// The session token was rejected (HTTP 401/403).
    #[error("session is no longer authorized")]
    Unauthorized,

    /// Anything else: unexpected status codes, undecodable payloads.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl ClientError {
    /// Whether this failure should force the user out of the current screen.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    /// Short message suitable for a snackbar or inline error row.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(reason) => reason.clone(),
            ClientError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ClientError::Unknown(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
            {
                return ClientError::Unauthorized;
            }
            return ClientError::Unknown(format!("unexpected status {status}"));
        }

        if err.is_timeout() || err.is_connect() || err.is_request() {
            ClientError::Network(err.to_string())
        } else {
            ClientError::Unknown(err.to_string())
        }
    }
}
