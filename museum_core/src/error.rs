//! Error types for the museum_core library.

use crate::Role;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for museum_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store file could not be read or written as a database
    #[error("Store error: {0}")]
    Store(String),

    /// User input rejected before reaching the store
    #[error("{0}")]
    Validation(String),

    /// A write would break a relational constraint
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Unknown user or wrong password. Deliberately says nothing about which.
    #[error("Invalid username or password")]
    AuthenticationFailed,

    /// Authenticated, but the role is not allowed to perform the action
    #[error("Action requires one of roles: [{}] (you are '{actual}')", format_roles(.required))]
    PermissionDenied { required: Vec<Role>, actual: Role },

    /// Password hashing primitive failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// True for failures caused by what the caller typed or was allowed to do,
    /// as opposed to environment failures (IO, corrupt store).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Integrity(_)
                | Error::NotFound { .. }
                | Error::AuthenticationFailed
                | Error::PermissionDenied { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message_names_roles() {
        let err = Error::PermissionDenied {
            required: vec![Role::Admin, Role::Curator],
            actual: Role::FrontDesk,
        };
        assert_eq!(
            err.to_string(),
            "Action requires one of roles: [admin, curator] (you are 'front_desk')"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound {
            entity: "artefact",
            id: 7,
        };
        assert_eq!(err.to_string(), "artefact 7 not found");
        assert!(err.is_user_facing());
    }
}
