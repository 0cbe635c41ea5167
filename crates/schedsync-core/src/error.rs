//! Centralized error types for the sync agent.
//!
//! This module provides a typed error hierarchy that:
//! - Separates transport failures from credential problems
//! - Provides short operator-facing messages for the CLI
//! - Preserves full error context for logging

use thiserror::Error;

/// Top-level error type for a sync run.
///
/// Every failure that ends a run early is convertible to this type.
/// Use `user_message()` for a one-line, non-technical summary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl AppError {
    /// Returns a short message suitable for printing to an operator.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. The next sync will try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. The next sync will try again."
            }
            NetworkError::ServerError { .. } => "The server rejected the request.",
            NetworkError::InvalidResponse(_) => "Received an unexpected response from the server.",
        }
    }
}

/// Configuration errors, raised while loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Credential store and session credential errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No stored session under key: {0}")]
    NotLoggedIn(String),

    #[error("Session has no token")]
    MissingToken,

    #[error("Malformed session credential: {0}")]
    MalformedCredential(String),

    #[error("Credential store error: {0}")]
    StorageError(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotLoggedIn(_) => "Not logged in. Sign in to the schedule site first.",
            AuthError::MissingToken => "Session found but it has no token. Sign in again.",
            AuthError::MalformedCredential(_) => "Stored session is unreadable. Sign in again.",
            AuthError::StorageError(_) => "Failed to read the credential store.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let auth_err = AuthError::MissingToken;
        let app_err: AppError = auth_err.into();
        assert!(matches!(app_err, AppError::Auth(AuthError::MissingToken)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Network(NetworkError::Timeout);
        assert_eq!(
            app_err.user_message(),
            "The request timed out. The next sync will try again."
        );
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let server = NetworkError::ServerError {
            status: 502,
            message: "bad gateway".into(),
        };
        let client = NetworkError::ServerError {
            status: 400,
            message: "bad request".into(),
        };
        assert!(server.user_message().contains("experiencing issues"));
        assert!(client.user_message().contains("rejected"));
    }

    #[test]
    fn test_auth_user_message_propagation() {
        let app_err: AppError = AuthError::StorageError("locked".into()).into();
        assert_eq!(app_err.user_message(), "Failed to read the credential store.");
        assert!(app_err.to_string().contains("locked"));
    }
}
