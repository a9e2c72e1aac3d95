//! MongoDB implementation of the database server seam
//!
//! Driver errors are mapped onto the bootstrap taxonomy by server error code
//! and driver error kind.

use crate::config::{BootstrapConfig, CredentialSpec};
use crate::error::{BootstrapError, Entity, Result};
use crate::server::{DatabaseServer, RoleBinding};
use mongodb::bson::{self, doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

// Server error codes, see src/mongo/base/error_codes.yml in the server tree
const BAD_VALUE: i32 = 2;
const UNAUTHORIZED: i32 = 13;
const AUTHENTICATION_FAILED: i32 = 18;
const ROLE_NOT_FOUND: i32 = 31;
const NAMESPACE_EXISTS: i32 = 48;
const INVALID_OPTIONS: i32 = 72;
const INVALID_NAMESPACE: i32 = 73;
const DUPLICATE_KEY: i32 = 11000;
const EXCEEDED_QUOTA: i32 = 12501;
const USER_ALREADY_EXISTS: i32 = 51003;

pub struct MongoServer {
    client: Client,
}

impl MongoServer {
    /// Build a client from the configured URI.
    ///
    /// The driver connects lazily; call `ping` to force a round trip.
    pub async fn connect(config: &BootstrapConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| classify(e, None))?;
        options.server_selection_timeout = Some(config.server_selection_timeout());
        options.app_name = Some(config.app_name.clone());

        let client = Client::with_options(options).map_err(|e| classify(e, None))?;
        Ok(Self { client })
    }
}

#[derive(Deserialize)]
struct UsersInfoReply {
    users: Vec<UserInfo>,
}

#[derive(Deserialize)]
struct UserInfo {
    user: String,
    db: String,
    roles: Vec<RoleBinding>,
}

impl DatabaseServer for MongoServer {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| classify(e, None))?;
        Ok(())
    }

    #[instrument(skip_all, fields(database = %database, username = %credential.username))]
    async fn create_user(
        &self,
        database: &str,
        credential: &CredentialSpec,
        roles: &[RoleBinding],
    ) -> Result<()> {
        let roles: Vec<Document> = roles
            .iter()
            .map(|r| doc! { "role": r.role.as_str(), "db": r.db.as_str() })
            .collect();

        debug!("Issuing createUser");
        self.client
            .database(database)
            .run_command(doc! {
                "createUser": credential.username.as_str(),
                "pwd": credential.password.as_str(),
                "roles": roles,
            })
            .await
            .map_err(|e| classify(e, Some((Entity::Credential, &credential.username))))?;
        Ok(())
    }

    async fn user_roles(&self, database: &str, username: &str) -> Result<Option<Vec<RoleBinding>>> {
        let reply = self
            .client
            .database(database)
            .run_command(doc! { "usersInfo": username })
            .await
            .map_err(|e| classify(e, None))?;

        let info: UsersInfoReply = bson::from_document(reply).map_err(|e| BootstrapError::Server {
            code: 0,
            message: format!("unexpected usersInfo reply: {}", e),
        })?;

        Ok(info
            .users
            .into_iter()
            .find(|u| u.user == username && u.db == database)
            .map(|u| u.roles))
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<()> {
        self.client
            .database(database)
            .create_collection(name)
            .await
            .map_err(|e| classify(e, Some((Entity::Collection, name))))
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| classify(e, None))
    }
}

/// Map a driver error onto the bootstrap taxonomy.
///
/// `duplicate` names the entity being created, if any; only then can a
/// duplicate code become `AlreadyExists`.
fn classify(err: MongoError, duplicate: Option<(Entity, &str)>) -> BootstrapError {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => classify_code(cmd.code, &cmd.message, duplicate),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => BootstrapError::connectivity(err.to_string()),
        ErrorKind::InvalidArgument { .. } => BootstrapError::invalid(err.to_string()),
        _ => BootstrapError::Server {
            code: 0,
            message: err.to_string(),
        },
    }
}

fn classify_code(code: i32, message: &str, duplicate: Option<(Entity, &str)>) -> BootstrapError {
    match (code, duplicate) {
        (USER_ALREADY_EXISTS | DUPLICATE_KEY, Some((entity @ Entity::Credential, name)))
        | (NAMESPACE_EXISTS, Some((entity @ Entity::Collection, name))) => {
            BootstrapError::AlreadyExists {
                entity,
                name: name.to_string(),
            }
        }
        (AUTHENTICATION_FAILED, _) => BootstrapError::connectivity(message),
        (BAD_VALUE | UNAUTHORIZED | ROLE_NOT_FOUND | INVALID_OPTIONS | INVALID_NAMESPACE
        | EXCEEDED_QUOTA, _) => BootstrapError::invalid(message),
        _ => BootstrapError::Server {
            code,
            message: message.to_string(),
        },
    }
}
