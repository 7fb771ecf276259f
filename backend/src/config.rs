//! Configuration management for the Automaten Manager
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AUTOMATEN__ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::SubmissionDefaults;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Defaults for refill submissions
    pub refill: RefillConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key the access tokens are signed with (HS256)
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefillConfig {
    /// VAT rate in percent used when a submission leaves it blank
    pub default_tax_rate: Decimal,

    /// Whether JSON submissions without the flag carry gross prices
    pub prices_include_tax: bool,

    /// Currency label for messages and exports
    pub currency: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AUTOMATEN_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("refill.default_tax_rate", "20")?
            .set_default("refill.prices_include_tax", true)?
            .set_default("refill.currency", shared::CURRENCY)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AUTOMATEN__ prefix)
            .add_source(
                Environment::with_prefix("AUTOMATEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Defaults applied to blank fields of a refill submission
    pub fn submission_defaults(&self) -> SubmissionDefaults {
        SubmissionDefaults {
            tax_rate: self.refill.default_tax_rate,
            prices_include_tax: self.refill.prices_include_tax,
        }
    }
}
