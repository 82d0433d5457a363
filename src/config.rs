//! Configuration manager for verdant.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name, used as token issuer.
    pub name: String,
    /// Listening port.
    pub port: Option<u16>,
    /// Keys accepted on the `x-api-key` header for administrative routes.
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(skip)]
    path: PathBuf,
    /// Related to session token configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Redis configuration.
    #[serde(skip_serializing)]
    pub redis: Option<Redis>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Related to automatic mail sending.
    #[serde(skip_serializing)]
    pub mail: Option<Mail>,
}

/// Session token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Shared signing secret.
    pub secret: String,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Redis configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Redis {
    /// Connection URL, e.g. `redis://127.0.0.1/`.
    pub url: String,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 19,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Mail {
    /// SMTP relay hostname.
    pub relay: String,
    /// Username credential to connect.
    pub username: String,
    /// Password credential to connect.
    pub password: String,
    /// `From` mailbox on outgoing mails.
    pub from: String,
    /// Bound on the in-flight send queue.
    pub queue_capacity: Option<usize>,
}

impl Configuration {
    /// Set path to get YAML configuration.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Read configuration file.
    pub fn read(mut self) -> Result<Self, Box<dyn std::error::Error>> {
        if self.path.as_os_str().is_empty() {
            self.path = DEFAULT_CONFIG_PATH.into();
        }

        let file = File::open(&self.path)?;
        let config: Configuration = serde_yaml::from_reader(file)?;

        Ok(Self {
            path: self.path,
            ..config
        })
    }
}
