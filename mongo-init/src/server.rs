//! Database server seam
//!
//! The runner only talks to the server through this trait. The target database
//! is passed to every call; there is no "current database" state.

use crate::config::CredentialSpec;
use crate::error::Result;
use serde::Deserialize;

/// A named role scoped to one database
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleBinding {
    pub role: String,
    pub db: String,
}

impl RoleBinding {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait DatabaseServer {
    /// Round trip to the server to prove it is reachable and we are authenticated.
    async fn ping(&self) -> Result<()>;

    /// Create `credential` in `database` with exactly `roles`.
    ///
    /// Returns `BootstrapError::AlreadyExists` if the username is taken.
    async fn create_user(
        &self,
        database: &str,
        credential: &CredentialSpec,
        roles: &[RoleBinding],
    ) -> Result<()>;

    /// Role bindings of `username` in `database`, or `None` if no such user.
    async fn user_roles(&self, database: &str, username: &str) -> Result<Option<Vec<RoleBinding>>>;

    /// Create an empty collection.
    ///
    /// Returns `BootstrapError::AlreadyExists` if it is already there.
    async fn create_collection(&self, database: &str, name: &str) -> Result<()>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;
}
