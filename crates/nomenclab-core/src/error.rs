//! Error taxonomy for remote catalog calls.
//!
//! Every failure of a remote call is mapped into exactly one
//! [`RemoteError`] variant, and every variant maps to exactly one
//! user-displayable message through [`RemoteError::user_message`].
//! Stale optimistic-concurrency rejections are not modeled separately;
//! they surface as the generic error of their HTTP status class.

use thiserror::Error;

/// Errors produced by the remote gateway.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No response was obtained (connection refused, timeout, DNS failure).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a 4xx status.
    #[error("HTTP {status}: {message}")]
    Client { status: u16, message: String },

    /// The server answered with a 5xx status.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body could not be parsed into the expected shape.
    #[error("Malformed response: {message}")]
    Decode { message: String },

    /// A mutation was attempted on an entity that has no `entityVersion`.
    ///
    /// Raised locally, before any request is built. Optimistic concurrency
    /// requires the last-observed version on every mutating call.
    #[error("{entity} has no entity version; refresh it before mutating")]
    MissingEntityVersion { entity: &'static str },
}

impl RemoteError {
    /// Create a new Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new Decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create the error matching an HTTP status code.
    ///
    /// 4xx maps to [`RemoteError::Client`], everything else that reaches
    /// this function maps to [`RemoteError::Server`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if (400..500).contains(&status) {
            Self::Client { status, message }
        } else {
            Self::Server { status, message }
        }
    }

    /// Check if this error is a client error (4xx category).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Client { .. } | Self::Decode { .. } | Self::MissingEntityVersion { .. }
        )
    }

    /// Check if this error is a server error (5xx category).
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// One user-displayable message per error family.
    ///
    /// Consumers (forms, tables) show this string verbatim; the raw remote
    /// detail stays in the `Display` output for logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network { .. } => "The server could not be reached. Check your connection.",
            Self::Client { status: 401, .. } => "Your session is not valid. Sign in again.",
            Self::Client { status: 403, .. } => "You do not have permission for this action.",
            Self::Client { status: 404, .. } => "The requested record no longer exists.",
            Self::Client { .. } | Self::MissingEntityVersion { .. } => {
                "The request was rejected. Reload the data and try again."
            }
            Self::Server { .. } => "The server failed to process the request. Try again later.",
            Self::Decode { .. } => "The server returned an unexpected response.",
        }
    }
}

/// Convenience result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_splits_client_and_server() {
        let client = RemoteError::from_status(409, "conflict");
        assert!(client.is_client_error());
        assert!(!client.is_server_error());
        assert_eq!(client.to_string(), "HTTP 409: conflict");

        let server = RemoteError::from_status(503, "unavailable");
        assert!(server.is_server_error());
        assert!(!server.is_client_error());
    }

    #[test]
    fn user_messages_are_one_per_family() {
        assert_eq!(
            RemoteError::from_status(401, "x").user_message(),
            RemoteError::from_status(401, "y").user_message()
        );
        assert_ne!(
            RemoteError::from_status(401, "x").user_message(),
            RemoteError::from_status(403, "x").user_message()
        );
        assert_ne!(
            RemoteError::network("down").user_message(),
            RemoteError::from_status(500, "boom").user_message()
        );
    }

    #[test]
    fn missing_entity_version_is_local_and_client_side() {
        let err = RemoteError::MissingEntityVersion { entity: "Analysis" };
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Analysis"));
    }
}
