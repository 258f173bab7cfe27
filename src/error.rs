//! Error types shared across the client.
//!
//! - `ApiError`: a backend call failed (transport, status, decode)
//! - `BoardError`: a kanban operation was refused locally
//! - `SessionError`: the session file could not be read or written
//! - `FieldErrors`: inline form validation messages

use crate::task::{Direction, Stage, TaskId};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    /// Text suitable for a notification. Prefers the server's own message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Transport { .. } => format!("{fallback} (connection error)"),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),

    #[error("cannot move {direction:?} from {stage}")]
    AtBoundary { stage: Stage, direction: Direction },

    #[error("task {id} is in {actual}, not {expected}")]
    WrongColumn {
        id: TaskId,
        expected: Stage,
        actual: Stage,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Inline validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when no field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "required");
        errors.insert("email", "invalid");
        assert_eq!(errors.get("email"), Some("required"));
        assert_eq!(errors.get("password"), None);
    }

    #[test]
    fn status_error_prefers_server_message() {
        let err = ApiError::Status {
            endpoint: "/owners/login".into(),
            status: 401,
            message: "Credenciales inválidas".into(),
        };
        assert_eq!(err.user_message("Login failed"), "Credenciales inválidas");

        let err = ApiError::Status {
            endpoint: "/owners/login".into(),
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message("Login failed"), "Login failed");
    }
}
