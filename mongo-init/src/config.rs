//! Bootstrap configuration
//!
//! Layered, later wins: built-in defaults, then an optional YAML file named by
//! `MONGO_INIT_CONFIG`, then environment variables.

use crate::error::{BootstrapError, Result};
use anyhow::Context;
use common::ConfigExt;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an optional YAML config file
pub const CONFIG_FILE_ENV: &str = "MONGO_INIT_CONFIG";

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "history_ai";
pub const DEFAULT_USERNAME: &str = "app_user";
pub const DEFAULT_PASSWORD: &str = "app_password";
pub const DEFAULT_ROLE: &str = "readWrite";
pub const DEFAULT_COLLECTIONS: [&str; 3] = ["checkpoints", "user_profile", "chat_history"];
pub const DEFAULT_SERVER_SELECTION_TIMEOUT_SECS: u64 = 10;

/// How the runner makes creation idempotent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Issue the create and absorb "already exists".
    #[default]
    TolerateDuplicates,
    /// Query existence first and only create what is missing.
    CheckThenCreate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TolerateDuplicates => write!(f, "tolerate-duplicates"),
            Self::CheckThenCreate => write!(f, "check-then-create"),
        }
    }
}

impl FromStr for Strategy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tolerate-duplicates" | "tolerate" => Ok(Self::TolerateDuplicates),
            "check-then-create" | "check" => Ok(Self::CheckThenCreate),
            other => Err(BootstrapError::invalid(format!(
                "unknown strategy '{}', expected tolerate-duplicates or check-then-create",
                other
            ))),
        }
    }
}

/// Application credential to provision
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSpec {
    pub username: String,
    pub password: String,
    pub role: String,
    /// Database the role is scoped to. Must equal the target database.
    pub role_database: String,
}

// Keep the secret out of logs
impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("role_database", &self.role_database)
            .finish()
    }
}

/// Everything one bootstrap run needs
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Connection string, including the administrative identity used to provision
    pub uri: String,
    pub database: String,
    pub credential: CredentialSpec,
    /// Created in this order
    pub collections: Vec<String>,
    pub strategy: Strategy,
    pub server_selection_timeout_secs: u64,
    pub app_name: String,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("database", &self.database)
            .field("credential", &self.credential)
            .field("collections", &self.collections)
            .field("strategy", &self.strategy)
            .field("server_selection_timeout_secs", &self.server_selection_timeout_secs)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Replace the `user:password@` part of a connection string.
pub fn redact_uri(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://").map(|i| i + 3) else {
        return uri.to_string();
    };
    let rest = &uri[scheme_end..];
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());

    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}<redacted>{}", &uri[..scheme_end], &rest[at..]),
        None => uri.to_string(),
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            credential: CredentialSpec {
                username: DEFAULT_USERNAME.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
                role: DEFAULT_ROLE.to_string(),
                role_database: DEFAULT_DATABASE.to_string(),
            },
            collections: DEFAULT_COLLECTIONS.iter().map(|c| c.to_string()).collect(),
            strategy: Strategy::default(),
            server_selection_timeout_secs: DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
            app_name: "mongo-init".to_string(),
        }
    }
}

/// One configuration layer. Unset fields leave the lower layer alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    pub uri: Option<String>,
    pub database: Option<String>,
    #[serde(default)]
    pub credential: CredentialOverrides,
    pub collections: Option<Vec<String>>,
    pub strategy: Option<Strategy>,
    pub server_selection_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub role_database: Option<String>,
}

impl Overrides {
    /// Parse a YAML config document
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse bootstrap config")
    }

    /// Read a YAML config file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bootstrap config {}", path))?;
        Self::from_yaml(&content)
    }

    /// Read the environment variable layer
    pub fn from_env() -> anyhow::Result<Self> {
        let strategy = String::env_opt("MONGO_INIT_STRATEGY")
            .map(|s| s.parse::<Strategy>())
            .transpose()?;

        let server_selection_timeout_secs = String::env_opt("MONGO_SERVER_SELECTION_TIMEOUT")
            .map(|v| {
                v.parse::<u64>()
                    .context("MONGO_SERVER_SELECTION_TIMEOUT must be a number of seconds")
            })
            .transpose()?;

        Ok(Self {
            uri: String::env_opt("MONGODB_URI").or_else(|| String::env_opt("MONGO_URI")),
            database: String::env_opt("MONGO_APP_DATABASE"),
            credential: CredentialOverrides {
                username: String::env_opt("MONGO_APP_USERNAME"),
                password: String::env_opt("MONGO_APP_PASSWORD"),
                role: String::env_opt("MONGO_APP_ROLE"),
                role_database: String::env_opt("MONGO_APP_ROLE_DATABASE"),
            },
            collections: String::env_list("MONGO_COLLECTIONS"),
            strategy,
            server_selection_timeout_secs,
        })
    }
}

impl BootstrapConfig {
    /// Load defaults, the optional config file, then the environment, and validate.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = String::env_opt(CONFIG_FILE_ENV) {
            config.apply(Overrides::from_file(&path)?);
        }
        config.apply(Overrides::from_env()?);

        config.validate()?;
        Ok(config)
    }

    /// Apply one layer on top of the current values.
    ///
    /// The role scope follows a changed database unless it was pinned to
    /// something else by an earlier layer or by this one.
    pub fn apply(&mut self, layer: Overrides) {
        if let Some(uri) = layer.uri {
            self.uri = uri;
        }
        if let Some(database) = layer.database {
            if self.credential.role_database == self.database {
                self.credential.role_database = database.clone();
            }
            self.database = database;
        }

        let cred = layer.credential;
        if let Some(username) = cred.username {
            self.credential.username = username;
        }
        if let Some(password) = cred.password {
            self.credential.password = password;
        }
        if let Some(role) = cred.role {
            self.credential.role = role;
        }
        if let Some(role_database) = cred.role_database {
            self.credential.role_database = role_database;
        }

        if let Some(collections) = layer.collections {
            self.collections = collections;
        }
        if let Some(strategy) = layer.strategy {
            self.strategy = strategy;
        }
        if let Some(secs) = layer.server_selection_timeout_secs {
            self.server_selection_timeout_secs = secs;
        }
    }

    /// Reject configurations that could never provision a usable database.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("database", &self.database),
            ("username", &self.credential.username),
            ("password", &self.credential.password),
            ("role", &self.credential.role),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(BootstrapError::invalid(format!("{} must not be empty", field)));
            }
        }

        if self.credential.role_database != self.database {
            return Err(BootstrapError::invalid(format!(
                "role {} is scoped to database '{}' but the target database is '{}'",
                self.credential.role, self.credential.role_database, self.database
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.collections {
            if name.is_empty() {
                return Err(BootstrapError::invalid("collection name must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(BootstrapError::invalid(format!(
                    "collection '{}' is declared more than once",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn uses_default_password(&self) -> bool {
        self.credential.password == DEFAULT_PASSWORD
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout_secs)
    }
}
