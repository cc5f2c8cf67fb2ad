use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidParent,
    Transport,
    MalformedResponse,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidParent => "INVALID_PARENT",
            Self::Transport => "TRANSPORT_ERROR",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
        }
    }

    /// Whether re-selecting the same parent can succeed without other changes.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transport)
    }
}

/// Failure of one list operation at the gateway boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationError {
    #[error("cannot list {level} options without a parent id")]
    InvalidParent { level: Level },

    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        request_id: Option<String>,
    },

    #[error("malformed {level} response: {reason}")]
    MalformedResponse { level: Level, reason: String },
}

impl LocationError {
    pub(crate) fn malformed(level: Level, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            level,
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(
        status: Option<u16>,
        message: impl Into<String>,
        request_id: &str,
    ) -> Self {
        Self::Transport {
            status,
            message: message.into(),
            request_id: Some(request_id.to_string()),
        }
    }

    /// A fetch attempted before the shell sent a valid configuration.
    pub(crate) fn not_configured() -> Self {
        Self::Transport {
            status: None,
            message: "location service is not configured".to_string(),
            request_id: None,
        }
    }

    /// Tags a transport failure that was raised without one.
    #[must_use]
    pub fn with_request_id(mut self, id: &str) -> Self {
        if let Self::Transport { request_id, .. } = &mut self {
            if request_id.is_none() {
                *request_id = Some(id.to_string());
            }
        }
        self
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Transport { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParent { .. } => ErrorKind::InvalidParent,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Text for the picker of `level` when its option list failed to load.
    #[must_use]
    pub fn user_facing_message(&self, level: Level) -> String {
        match self {
            Self::InvalidParent { .. } => match level.parent() {
                Some(parent) => format!("Select a {parent} first."),
                None => format!("Unable to load {}.", level.plural_label()),
            },
            Self::Transport { .. } => format!(
                "Could not load {}. Check your connection and try again.",
                level.plural_label()
            ),
            Self::MalformedResponse { .. } => format!(
                "The server sent an unexpected list of {}. Please try again later.",
                level.plural_label()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_codes() {
        let invalid = LocationError::InvalidParent {
            level: Level::Department,
        };
        let malformed = LocationError::malformed(Level::Village, "not a list");
        let transport = LocationError::Transport {
            status: Some(503),
            message: "unavailable".into(),
            request_id: None,
        };

        assert_eq!(invalid.code(), "INVALID_PARENT");
        assert_eq!(malformed.code(), "MALFORMED_RESPONSE");
        assert_eq!(transport.code(), "TRANSPORT_ERROR");
        assert_eq!(transport.status(), Some(503));
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(ErrorKind::Transport.is_retryable());
        assert!(!ErrorKind::InvalidParent.is_retryable());
        assert!(!ErrorKind::MalformedResponse.is_retryable());
    }

    #[test]
    fn user_facing_messages_name_the_level() {
        let invalid = LocationError::InvalidParent {
            level: Level::Municipality,
        };
        assert_eq!(
            invalid.user_facing_message(Level::Municipality),
            "Select a department first."
        );

        let transport = LocationError::not_configured();
        assert!(transport
            .user_facing_message(Level::Village)
            .starts_with("Could not load villages"));
    }

    #[test]
    fn transport_errors_keep_request_id() {
        let error = LocationError::transport(Some(502), "bad gateway", "req-42");
        assert_eq!(error.request_id(), Some("req-42"));
        assert_eq!(error.status(), Some(502));
    }

    #[test]
    fn with_request_id_fills_only_missing_transport_ids() {
        let tagged = LocationError::not_configured().with_request_id("req-1");
        assert_eq!(tagged.request_id(), Some("req-1"));

        let kept = LocationError::transport(None, "offline", "req-2").with_request_id("req-3");
        assert_eq!(kept.request_id(), Some("req-2"));

        let malformed = LocationError::malformed(Level::Country, "x").with_request_id("req-4");
        assert_eq!(malformed.request_id(), None);
    }
}
