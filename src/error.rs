use thiserror::Error;

use crate::sync::RoomTicket;

const GENERIC_FAILURE: &str = "Request failed";

/// Failure reported by the remote store, before it is attributed to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transport failure: connect, timeout, non-2xx status.
    #[error("network error: {0}")]
    Network(String),
    /// The server answered `success: false`.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_FAILURE))]
    Application(Option<String>),
    /// The body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Protocol(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Protocol(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyContent,
    #[error("no active room")]
    NoActiveRoom,
    #[error("a send is already in progress")]
    SendInFlight,
    #[error("network error: {0}")]
    Network(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

impl SendError {
    pub fn user_notice(&self) -> String {
        match self {
            SendError::Network(_) => "Connection error".to_string(),
            SendError::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for SendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Network(detail) | StoreError::Protocol(detail) => {
                SendError::Network(detail)
            }
            StoreError::Application(message) => SendError::Rejected(
                message.unwrap_or_else(|| "Failed to send message".to_string()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_FAILURE))]
    Application(Option<String>),
    /// The response belongs to a room that is no longer active.
    #[error("stale response for room {} (epoch {})", .issued_for.room, .issued_for.epoch)]
    Stale { issued_for: RoomTicket },
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Network(detail) | StoreError::Protocol(detail) => {
                FetchError::Network(detail)
            }
            StoreError::Application(message) => FetchError::Application(message),
        }
    }
}

/// Failure while resolving the room for a selected peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{}", .0.as_deref().unwrap_or("Failed to create room"))]
    Application(Option<String>),
}

impl SelectError {
    pub fn user_notice(&self) -> String {
        match self {
            SelectError::Network(_) => "Failed to create room".to_string(),
            SelectError::Application(_) => self.to_string(),
        }
    }
}

impl From<StoreError> for SelectError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Network(detail) | StoreError::Protocol(detail) => {
                SelectError::Network(detail)
            }
            StoreError::Application(message) => SelectError::Application(message),
        }
    }
}
