//! # Server Configuration
//!
//! ## Configuration Sources (in priority order)
//! 1. Environment variables (highest priority)
//! 2. Config file (`STOREFRONT_CONFIG` or `./storefront.toml`)
//! 3. Default values (lowest priority)
//!
//! ## Example Config File
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//! request_timeout_secs = 30
//! dev_mode = false
//!
//! [database]
//! path = "./data/storefront.db"
//! max_connections = 5
//!
//! [auth]
//! jwt_secret = "change-me"
//! token_lifetime_secs = 86400
//! bootstrap_admin = true
//!
//! [pricing]
//! free_shipping_threshold_cents = 5000
//! flat_shipping_cents = 500
//! tax_rate_bps = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use storefront_core::pricing::validate_config;
use storefront_core::{Money, PricingConfig, TaxRate};
use storefront_db::DbConfig;

const DEV_JWT_SECRET: &str = "storefront-dev-secret-change-in-production";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub pricing: PricingSection,
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Requests running longer than this get a 408.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Adds internal error detail to 500 responses.
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            bind_addr: default_bind_addr(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            dev_mode: false,
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/storefront.db")
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: i64,

    /// The first account registered while no admin exists becomes admin.
    #[serde(default = "default_true")]
    pub bootstrap_admin: bool,
}

impl Default for AuthSection {
    fn default() -> Self {
        AuthSection {
            jwt_secret: default_jwt_secret(),
            token_lifetime_secs: default_token_lifetime(),
            bootstrap_admin: true,
        }
    }
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_lifetime() -> i64 {
    86_400 // 24 hours
}

fn default_true() -> bool {
    true
}

/// Pricing policy as written in the config file. Amounts are cents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingSection {
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold_cents: i64,

    #[serde(default = "default_flat_shipping")]
    pub flat_shipping_cents: i64,

    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

impl Default for PricingSection {
    fn default() -> Self {
        PricingSection {
            free_shipping_threshold_cents: default_free_shipping_threshold(),
            flat_shipping_cents: default_flat_shipping(),
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

fn default_free_shipping_threshold() -> i64 {
    5_000
}

fn default_flat_shipping() -> i64 {
    500
}

fn default_tax_rate_bps() -> u32 {
    1_000
}

impl PricingSection {
    pub fn to_pricing(&self) -> PricingConfig {
        PricingConfig {
            free_shipping_threshold: Money::from_cents(self.free_shipping_threshold_cents),
            flat_shipping_cost: Money::from_cents(self.flat_shipping_cents),
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl AppConfig {
    /// Loads configuration from file, environment and defaults.
    ///
    /// A missing config file is not an error; an unreadable or malformed
    /// one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            info!(?path, "Loading config from file");
            config = Self::from_file(&path)?;
        } else {
            debug!(?path, "Config file not found, using defaults");
        }

        config.apply_env_overrides();
        config.validate()?;

        if config.auth.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set JWT_SECRET in production");
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }

        if self.auth.token_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "token_lifetime_secs must be greater than 0".into(),
            ));
        }

        validate_config(&self.pricing.to_pricing())
            .map_err(|e| ConfigError::Invalid(format!("pricing: {}", e)))?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("STOREFRONT_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(port) = std::env::var("STOREFRONT_PORT") {
            if let Some(p) = parse_override::<u16>("STOREFRONT_PORT", &port) {
                debug!(port = p, "Overriding port from environment");
                self.server.port = p;
            }
        }

        if let Ok(secs) = std::env::var("STOREFRONT_REQUEST_TIMEOUT_SECS") {
            if let Some(s) = parse_override::<u64>("STOREFRONT_REQUEST_TIMEOUT_SECS", &secs) {
                self.server.request_timeout_secs = s;
            }
        }

        if let Ok(flag) = std::env::var("STOREFRONT_DEV_MODE") {
            self.server.dev_mode = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Ok(bps) = std::env::var("STOREFRONT_TAX_RATE_BPS") {
            if let Some(b) = parse_override::<u32>("STOREFRONT_TAX_RATE_BPS", &bps) {
                self.pricing.tax_rate_bps = b;
            }
        }
    }

    fn default_config_path() -> PathBuf {
        std::env::var("STOREFRONT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storefront.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.server.bind_addr, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn pricing(&self) -> PricingConfig {
        self.pricing.to_pricing()
    }
}

/// Parses a numeric environment override, warning and returning `None`
/// when the value does not parse.
fn parse_override<T: std::str::FromStr>(var: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
