use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "CART";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
    /// Present only for the DynamoDB backend
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    #[serde(default = "default_carts_table")]
    pub carts_table_name: String,
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_products_table")]
    pub products_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint override, e.g. DynamoDB Local
    #[serde(default)]
    pub dynamodb_endpoint: Option<String>,
    #[serde(default)]
    pub create_tables: bool,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub dynamodb_client: DynamoDbClient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

/// Where carts, users and products are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::ValidationError {
                message: format!(
                    "Unknown storage backend '{}', expected 'dynamodb' or 'memory'",
                    other
                ),
            }),
        }
    }
}

impl Config {
    /// Load and validate configuration, building the AWS client when DynamoDB is selected
    pub async fn from_environment() -> Result<Self, ConfigError> {
        let mut config = Self::from_env_vars()?;

        if config.database.backend()? == StorageBackend::DynamoDb {
            config.aws = Some(AwsConfig::load(&config.database).await);
        }

        info!(
            backend = %config.database.storage_backend,
            port = config.server.port,
            "Configuration loaded"
        );
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Read every section from the environment without touching AWS
    pub fn from_env_vars() -> Result<Self, ConfigError> {
        let mut observability: ObservabilityConfig = load_section("observability")?;
        observability.otlp_endpoint = observability
            .otlp_endpoint
            .filter(|endpoint| !endpoint.trim().is_empty());

        let config = Config {
            server: load_section("server")?,
            database: load_section("database")?,
            observability,
            aws: None,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Max request size cannot be 0".to_string(),
            });
        }

        self.database.backend()?;

        for (name, value) in [
            ("Carts", &self.database.carts_table_name),
            ("Users", &self.database.users_table_name),
            ("Products", &self.database.products_table_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{} table name cannot be empty", name),
                });
            }
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        self.storage_backend.parse()
    }
}

impl AwsConfig {
    async fn load(database: &DatabaseConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(database.region.clone()));

        if let Some(endpoint) = &database.dynamodb_endpoint {
            info!(endpoint = %endpoint, "Using DynamoDB endpoint override");
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        Self {
            region: database.region.clone(),
            dynamodb_client: DynamoDbClient::new(&sdk_config),
        }
    }
}

fn load_section<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_storage_backend() -> String {
    "dynamodb".to_string()
}

pub(crate) fn default_carts_table() -> String {
    "Carts".to_string()
}

pub(crate) fn default_users_table() -> String {
    "Users".to_string()
}

pub(crate) fn default_products_table() -> String {
    "Products".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "cart-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
