//! MongoDB bootstrap for application startup
//!
//! Provisions the runtime state an application expects before it accepts
//! traffic:
//! - An application credential with a single role binding on the target database
//! - A declared, ordered set of empty collections
//!
//! Every run is idempotent: re-running against a provisioned server converges
//! on the same state and does not fail.

pub mod config;
pub mod error;
pub mod mongo;
pub mod runner;
pub mod server;

#[cfg(test)]
mod testing;

pub use config::{BootstrapConfig, CredentialSpec, Strategy};
pub use error::{BootstrapError, Entity};
pub use mongo::MongoServer;
pub use runner::{run_bootstrap, BootstrapReport};
pub use server::{DatabaseServer, RoleBinding};
