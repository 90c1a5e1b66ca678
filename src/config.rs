use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::probe::Endpoint;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub region: String,
    pub port: u16,
    pub node_env: String,
    pub log_dir: String,

    pub db_writer_host: String,
    pub db_reader_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_ms: u64,

    pub alb_seoul_url: String,
    pub alb_us_east_url: String,
    pub alb_us_west_url: String,
    pub peer_timeout_ms: u64,

    pub replication_max_attempts: u32,
    pub replication_interval_ms: u64,
    pub marker_retention_hours: Option<u64>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    region: Option<String>,
    port: Option<u16>,
    node_env: Option<String>,
    log_dir: Option<String>,

    db_writer_host: Option<String>,
    db_reader_host: Option<String>,
    db_port: Option<u16>,
    db_user: Option<String>,
    db_password: Option<String>,
    db_name: Option<String>,
    db_max_connections: Option<u32>,
    db_acquire_timeout_ms: Option<u64>,

    alb_seoul_url: Option<String>,
    alb_us_east_url: Option<String>,
    alb_us_west_url: Option<String>,
    peer_timeout_ms: Option<u64>,

    replication_max_attempts: Option<u32>,
    replication_interval_ms: Option<u64>,
    marker_retention_hours: Option<u64>,
}

// envy only sees exact field names, so the AWS-style region key is read separately.
#[derive(Deserialize, Default, Debug)]
struct RegionEnv {
    aws_region: Option<String>,
}

fn default_region() -> String {
    "unknown".to_string()
}

fn default_node_env() -> String {
    "development".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_seoul_url() -> String {
    "http://seoul-alb.example.com/health".to_string()
}

fn default_us_east_url() -> String {
    "http://us-east-alb.example.com/health".to_string()
}

fn default_us_west_url() -> String {
    "http://us-west-alb.example.com/health".to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialAppConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| {
                    ConfigError::ReadFile {
                        path: path_str.to_string(),
                        source,
                    }
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::ParseToml {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialAppConfig::default(),
        };

        // 2. Load from environment variables
        let mut env_config: PartialAppConfig = envy::from_env()?;
        if env_config.region.is_none() {
            env_config.region = envy::from_env::<RegionEnv>()?.aws_region;
        }

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env: PartialAppConfig, file: PartialAppConfig) -> Result<Self, ConfigError> {
        let db_writer_host = env
            .db_writer_host
            .or(file.db_writer_host)
            .ok_or(ConfigError::Missing("DB_WRITER_HOST"))?;
        let db_reader_host = env
            .db_reader_host
            .or(file.db_reader_host)
            .unwrap_or_else(|| db_writer_host.clone());

        Ok(AppConfig {
            region: env.region.or(file.region).unwrap_or_else(default_region),
            port: env.port.or(file.port).unwrap_or(3001),
            node_env: env.node_env.or(file.node_env).unwrap_or_else(default_node_env),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            db_writer_host,
            db_reader_host,
            db_port: env.db_port.or(file.db_port).unwrap_or(5432),
            db_user: env.db_user.or(file.db_user).unwrap_or_default(),
            db_password: env.db_password.or(file.db_password).unwrap_or_default(),
            db_name: env.db_name.or(file.db_name).unwrap_or_default(),
            db_max_connections: env
                .db_max_connections
                .or(file.db_max_connections)
                .unwrap_or(5),
            db_acquire_timeout_ms: env
                .db_acquire_timeout_ms
                .or(file.db_acquire_timeout_ms)
                .unwrap_or(5000),
            alb_seoul_url: env
                .alb_seoul_url
                .or(file.alb_seoul_url)
                .unwrap_or_else(default_seoul_url),
            alb_us_east_url: env
                .alb_us_east_url
                .or(file.alb_us_east_url)
                .unwrap_or_else(default_us_east_url),
            alb_us_west_url: env
                .alb_us_west_url
                .or(file.alb_us_west_url)
                .unwrap_or_else(default_us_west_url),
            peer_timeout_ms: env.peer_timeout_ms.or(file.peer_timeout_ms).unwrap_or(5000),
            replication_max_attempts: env
                .replication_max_attempts
                .or(file.replication_max_attempts)
                .unwrap_or(10)
                .max(1),
            replication_interval_ms: env
                .replication_interval_ms
                .or(file.replication_interval_ms)
                .unwrap_or(100),
            marker_retention_hours: env.marker_retention_hours.or(file.marker_retention_hours),
        })
    }

    /// Peer regions in the fixed order they are reported.
    pub fn peer_endpoints(&self) -> Vec<Endpoint> {
        vec![
            Endpoint::new("ap-northeast-2", &self.alb_seoul_url),
            Endpoint::new("us-east-1", &self.alb_us_east_url),
            Endpoint::new("us-west-2", &self.alb_us_west_url),
        ]
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn replication_interval(&self) -> Duration {
        Duration::from_millis(self.replication_interval_ms)
    }

    pub fn is_development(&self) -> bool {
        self.node_env == "development"
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let env = PartialAppConfig {
            region: Some("us-east-1".to_string()),
            db_writer_host: Some("writer.db.internal".to_string()),
            db_reader_host: Some("reader.db.internal".to_string()),
            ..Default::default()
        };
        Self::merge(env, PartialAppConfig::default()).expect("writer host is set")
    }
}
