//! Configuration
//!
//! An explicit configuration value object built once at process start from
//! environment variables (`.env` is loaded first when present) and passed
//! into each component constructor. A missing required variable is fatal
//! before any network operation is attempted. No ambient global lookup.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("required environment variable {} is not set", name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Azure Document Intelligence settings
#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub key: String,
}

impl AzureSettings {
    pub fn from_env() -> Result<Self> {
        let endpoint = require("AZURE_ENDPOINT")?;
        if !endpoint.starts_with("https://") {
            return Err(anyhow!("AZURE_ENDPOINT must start with https://"));
        }
        Ok(Self {
            endpoint,
            key: require("AZURE_KEY")?,
        })
    }
}

/// Table-cleaner (LLM) settings
#[derive(Debug, Clone)]
pub struct CleanerSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub base_url: Option<String>,
}

impl CleanerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: require("GROQ_API_KEY")?,
            model: optional("GROQ_MODEL", "moonshotai/kimi-k2-instruct-0905"),
            temperature: optional("GROQ_TEMPERATURE", "0.1")
                .parse()
                .context("GROQ_TEMPERATURE must be a number")?,
            base_url: std::env::var("GROQ_BASE_URL").ok(),
        })
    }
}

/// Graph store settings (Neo4j HTTP API)
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub http_url: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl GraphSettings {
    pub fn from_env() -> Result<Self> {
        let http_url = require("NEO4J_HTTP_URL")?;
        if !(http_url.starts_with("http://") || http_url.starts_with("https://")) {
            return Err(anyhow!("NEO4J_HTTP_URL must start with http:// or https://"));
        }
        Ok(Self {
            http_url,
            database: optional("NEO4J_DATABASE", "neo4j"),
            username: optional("NEO4J_USERNAME", "neo4j"),
            password: require("NEO4J_PASSWORD")?,
        })
    }
}

/// Data file settings
#[derive(Debug, Clone)]
pub struct DataSettings {
    pub isin_mapping_path: PathBuf,
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
}

impl DataSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            isin_mapping_path: PathBuf::from(require("ISIN_MAPPING_PATH")?),
            raw_data_dir: PathBuf::from(optional("RAW_DATA_DIR", "data/raw")),
            processed_data_dir: PathBuf::from(optional("PROCESSED_DATA_DIR", "data/processed")),
        })
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub azure: AzureSettings,
    pub cleaner: CleanerSettings,
    pub graph: GraphSettings,
    pub data: DataSettings,
}

impl AppConfig {
    /// Load every section. Commands that only need a subset use the
    /// per-section `from_env` constructors instead.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            azure: AzureSettings::from_env()?,
            cleaner: CleanerSettings::from_env()?,
            graph: GraphSettings::from_env()?,
            data: DataSettings::from_env()?,
        })
    }
}
