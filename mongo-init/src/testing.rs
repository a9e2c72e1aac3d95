//! In-memory database server for runner tests
//!
//! Mirrors the server behaviour the runner relies on: duplicate users and
//! collections are rejected with `AlreadyExists`, unknown roles are rejected,
//! and an unreachable server fails every call.

use crate::config::CredentialSpec;
use crate::error::{BootstrapError, Entity, Result};
use crate::server::{DatabaseServer, RoleBinding};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    CreateUser { database: String, username: String },
    UserRoles { database: String, username: String },
    CreateCollection { database: String, name: String },
    ListCollections { database: String },
}

impl Call {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::CreateUser { .. } | Self::CreateCollection { .. })
    }
}

struct State {
    reachable: bool,
    known_roles: HashSet<String>,
    users: BTreeMap<(String, String), Vec<RoleBinding>>,
    collections: BTreeMap<String, Vec<String>>,
    rejected_collection: Option<String>,
    calls: Vec<Call>,
}

pub struct FakeServer {
    state: Mutex<State>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                reachable: true,
                known_roles: ["read", "readWrite", "dbAdmin", "dbOwner"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                users: BTreeMap::new(),
                collections: BTreeMap::new(),
                rejected_collection: None,
                calls: Vec::new(),
            }),
        }
    }

    pub fn unreachable() -> Self {
        let server = Self::new();
        server.state.lock().unwrap().reachable = false;
        server
    }

    pub fn with_user(self, database: &str, username: &str, roles: Vec<RoleBinding>) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert((database.to_string(), username.to_string()), roles);
        self
    }

    pub fn with_collection(self, database: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(database.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    /// Make creation of `name` fail with an invalid-namespace style error.
    pub fn rejecting_collection(self, name: &str) -> Self {
        self.state.lock().unwrap().rejected_collection = Some(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn collections(&self, database: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(database)
            .cloned()
            .unwrap_or_default()
    }

    pub fn roles_of(&self, database: &str, username: &str) -> Option<Vec<RoleBinding>> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(&(database.to_string(), username.to_string()))
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.reachable {
            Ok(state)
        } else {
            Err(BootstrapError::connectivity(
                "server selection timeout: no available servers",
            ))
        }
    }
}

impl DatabaseServer for FakeServer {
    async fn ping(&self) -> Result<()> {
        self.record(Call::Ping).map(|_| ())
    }

    async fn create_user(
        &self,
        database: &str,
        credential: &CredentialSpec,
        roles: &[RoleBinding],
    ) -> Result<()> {
        let mut state = self.record(Call::CreateUser {
            database: database.to_string(),
            username: credential.username.clone(),
        })?;

        let key = (database.to_string(), credential.username.clone());
        if state.users.contains_key(&key) {
            return Err(BootstrapError::AlreadyExists {
                entity: Entity::Credential,
                name: credential.username.clone(),
            });
        }
        if let Some(unknown) = roles.iter().find(|r| !state.known_roles.contains(&r.role)) {
            return Err(BootstrapError::invalid(format!(
                "Could not find role: {}@{}",
                unknown.role, unknown.db
            )));
        }

        state.users.insert(key, roles.to_vec());
        Ok(())
    }

    async fn user_roles(&self, database: &str, username: &str) -> Result<Option<Vec<RoleBinding>>> {
        let state = self.record(Call::UserRoles {
            database: database.to_string(),
            username: username.to_string(),
        })?;
        Ok(state
            .users
            .get(&(database.to_string(), username.to_string()))
            .cloned())
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<()> {
        let mut state = self.record(Call::CreateCollection {
            database: database.to_string(),
            name: name.to_string(),
        })?;

        if state.rejected_collection.as_deref() == Some(name) {
            return Err(BootstrapError::invalid(format!("Invalid collection name: {}", name)));
        }

        let existing = state.collections.entry(database.to_string()).or_default();
        if existing.iter().any(|c| c == name) {
            return Err(BootstrapError::AlreadyExists {
                entity: Entity::Collection,
                name: name.to_string(),
            });
        }
        existing.push(name.to_string());
        Ok(())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        let state = self.record(Call::ListCollections {
            database: database.to_string(),
        })?;
        Ok(state.collections.get(database).cloned().unwrap_or_default())
    }
}
