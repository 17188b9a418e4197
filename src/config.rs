use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use sqlx::mysql::MySqlConnectOptions;
use std::fs;
use std::path::Path;

const DEFAULT_MYSQL_PORT: u16 = 3306;
const CATALOG_DATABASE: &str = "information_schema";

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read config file: {}", source))]
    FileRead { source: std::io::Error },

    #[snafu(display("Failed to parse YAML config: {}", source))]
    YamlParse { source: serde_yaml::Error },

    #[snafu(display("Invalid host '{}': expected <host> or <host>:<port>", host))]
    InvalidHost { host: String },
}

/// Catalog backends the loader can read metadata from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    #[default]
    Mysql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub adapter: Adapter,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub host: String,
    /// Also analyze `mysql`, `sys`, `performance_schema` and `information_schema`
    #[serde(default)]
    pub include_system_schemas: bool,
}

type Result<T, E = ConfigError> = std::result::Result<T, E>;

impl DbConfig {
    pub fn from_connection_params(
        adapter: Adapter,
        user: String,
        password: String,
        host: String,
        include_system_schemas: bool,
    ) -> Self {
        Self {
            adapter,
            user,
            password,
            host,
            include_system_schemas,
        }
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path).context(FileReadSnafu)?;
        let configs: Vec<DbConfig> = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        Ok(configs)
    }

    /// Connection options against the catalog database of the configured server.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let (host, port) = split_host(&self.host)?;
        Ok(MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&self.user)
            .password(&self.password)
            .database(CATALOG_DATABASE))
    }

    /// `user@host`, safe to log.
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

fn split_host(host: &str) -> Result<(String, u16)> {
    let invalid = || ConfigError::InvalidHost {
        host: host.to_string(),
    };

    match host.rsplit_once(':') {
        Some((name, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            if name.is_empty() {
                return Err(invalid());
            }
            Ok((name.to_string(), port))
        }
        None if host.is_empty() => Err(invalid()),
        None => Ok((host.to_string(), DEFAULT_MYSQL_PORT)),
    }
}
