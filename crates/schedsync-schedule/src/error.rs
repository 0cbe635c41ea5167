//! Schedule API error types.

use schedsync_core::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Schedule API rejected the token ({0})")]
    Unauthorized(u16),

    #[error("Schedule API error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid schedule response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl ScheduleError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(status) | Self::Api { status, .. } => Some(*status),
            Self::InvalidResponse(_) | Self::Network(_) => None,
        }
    }

    /// Whether the stored session is likely stale and the user must sign in again.
    pub fn needs_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
