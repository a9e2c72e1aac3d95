//! Bootstrap error taxonomy
//!
//! Separates the benign "already exists" outcome from every fatal failure so
//! the runner decides fatality by variant, not by message text.

use std::fmt;
use thiserror::Error;

/// Kind of entity the bootstrap provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Credential,
    Collection,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "credential"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Server unreachable or the connecting identity was rejected.
    #[error("connectivity error: {message}")]
    Connectivity { message: String },

    /// The entity is already present. Never fatal.
    #[error("{entity} {name} already exists")]
    AlreadyExists { entity: Entity, name: String },

    /// Malformed role, invalid name, permission or quota denial, bad config.
    #[error("invalid specification: {message}")]
    InvalidSpecification { message: String },

    /// Credential exists but does not carry the declared role binding.
    #[error("credential {username} exists without role {role} on database {database}")]
    CredentialMismatch {
        username: String,
        database: String,
        role: String,
    },

    /// Any other failure reported by the server.
    #[error("server error (code {code}): {message}")]
    Server { code: i32, message: String },
}

impl BootstrapError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    /// True for the benign duplicate outcome; every other variant aborts the run.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
