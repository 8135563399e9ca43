//! Configuration loading and management

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for the authorization server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hostname used when building absolute URIs (issuer, endpoint URLs)
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Grant (authorization code) lifetime in seconds (default: 5 minutes)
    #[serde(default = "default_max_grant_life")]
    pub max_grant_life_secs: u64,

    /// Access token lifetime in seconds (default: 1 week)
    #[serde(default = "default_max_token_life")]
    pub max_token_life_secs: u64,

    /// Group a caller must belong to before introspecting tokens
    /// If not set, any authenticated caller may introspect
    pub introspect_group: Option<String>,

    /// Group a caller must belong to before registering clients
    /// If not set, any authenticated caller may register
    pub register_group: Option<String>,

    /// Secret mixed into generated token strings
    /// If not set, a random secret is generated at startup
    pub secret: Option<String>,

    /// Password accepted for any username; testing only
    pub test_password: Option<String>,

    /// Client applications seeded into the registry at startup
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,

    /// User accounts known to the credential verifier
    #[serde(default)]
    pub users: Vec<UserAccount>,
}

/// A statically registered OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub client_name: Option<String>,
}

/// A user account the credential verifier can authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    /// Group names used for introspect/register access checks
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_server_name() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_max_grant_life() -> u64 {
    300 // 5 minutes
}

fn default_max_token_life() -> u64 {
    604800 // 1 week
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            port: default_port(),
            max_grant_life_secs: default_max_grant_life(),
            max_token_life_secs: default_max_token_life(),
            introspect_group: None,
            register_group: None,
            secret: None,
            test_password: None,
            applications: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the given file path
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path);

        if config_file.exists() {
            let content = std::fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", config_file))?;
            tracing::info!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_file);
            let config = Config::default();

            if let Some(parent) = config_file.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create config directory: {:?}", parent)
                    })?;
                }
            }

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }

    /// Base URL for issuer and endpoint URIs, e.g. `https://example.com:9000`
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.server_name, self.port)
    }
}
