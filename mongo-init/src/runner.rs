//! Bootstrap runner
//!
//! Linear sequence against one server: probe, ensure the application
//! credential, ensure each declared collection in order. Any error other than
//! "already exists" aborts the run; whatever was created before stays created.

use crate::config::{BootstrapConfig, CredentialSpec, Strategy};
use crate::error::{BootstrapError, Result};
use crate::server::{DatabaseServer, RoleBinding};
use std::slice;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub credential_created: bool,
    pub collections_created: Vec<String>,
    pub collections_existing: Vec<String>,
    pub duration: Duration,
}

/// Provision the target database described by `config` on `server`.
#[instrument(skip_all, fields(database = %config.database, strategy = %config.strategy))]
pub async fn run_bootstrap<S: DatabaseServer>(
    server: &S,
    config: &BootstrapConfig,
) -> Result<BootstrapReport> {
    config.validate()?;

    let start = Instant::now();
    let database = config.database.as_str();

    server.ping().await?;
    info!("Connected to server");

    let binding = RoleBinding::new(config.credential.role.as_str(), database);
    let credential_created =
        ensure_credential(server, database, &config.credential, &binding, config.strategy).await?;

    let present = match config.strategy {
        Strategy::CheckThenCreate => server.list_collections(database).await?,
        Strategy::TolerateDuplicates => Vec::new(),
    };

    let mut collections_created = Vec::new();
    let mut collections_existing = Vec::new();

    for name in &config.collections {
        let created = if present.contains(name) {
            false
        } else {
            create_collection(server, database, name).await?
        };

        if created {
            info!(collection = %name, "Created collection");
            collections_created.push(name.clone());
        } else {
            info!(collection = %name, "Collection already exists");
            collections_existing.push(name.clone());
        }
    }

    let report = BootstrapReport {
        credential_created,
        collections_created,
        collections_existing,
        duration: start.elapsed(),
    };

    info!(
        username = %config.credential.username,
        credential_created = report.credential_created,
        created = report.collections_created.len(),
        existing = report.collections_existing.len(),
        duration_ms = report.duration.as_millis() as u64,
        "MongoDB initialized successfully!"
    );

    Ok(report)
}

/// Returns whether the credential was created by this run.
async fn ensure_credential<S: DatabaseServer>(
    server: &S,
    database: &str,
    credential: &CredentialSpec,
    binding: &RoleBinding,
    strategy: Strategy,
) -> Result<bool> {
    let username = credential.username.as_str();

    if strategy == Strategy::CheckThenCreate {
        if let Some(roles) = server.user_roles(database, username).await? {
            require_binding(&roles, credential, binding)?;
            info!(username, "Credential already exists");
            return Ok(false);
        }
    }

    match server
        .create_user(database, credential, slice::from_ref(binding))
        .await
    {
        Ok(()) => {
            info!(username, role = %binding.role, "Created credential");
            Ok(true)
        }
        Err(e) if e.is_duplicate() => {
            info!(username, "Credential already exists");
            let roles = server
                .user_roles(database, username)
                .await?
                .unwrap_or_default();
            require_binding(&roles, credential, binding)?;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// An existing credential is only usable if it carries the declared binding.
fn require_binding(
    roles: &[RoleBinding],
    credential: &CredentialSpec,
    binding: &RoleBinding,
) -> Result<()> {
    if roles.contains(binding) {
        Ok(())
    } else {
        Err(BootstrapError::CredentialMismatch {
            username: credential.username.clone(),
            database: binding.db.clone(),
            role: binding.role.clone(),
        })
    }
}

/// Returns false when the collection was already there.
async fn create_collection<S: DatabaseServer>(
    server: &S,
    database: &str,
    name: &str,
) -> Result<bool> {
    match server.create_collection(database, name).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_duplicate() => Ok(false),
        Err(e) => Err(e),
    }
}
