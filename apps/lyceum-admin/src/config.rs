//! Admin tool configuration, stored in `~/.lyceum/config.json`.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Run 'lyceum-admin init' first.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Main admin configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminConfig {
    /// Site whose invitations this tool administers.
    pub site: String,
    /// Base URL redemption links are built against.
    pub base_url: String,
    /// Sender identity recorded on invitations issued from this tool.
    #[serde(default = "default_sender")]
    pub sender: String,
    /// HMAC key for signed redemption links (hex-encoded, 32 bytes).
    pub signing_key: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

fn default_sender() -> String {
    "site-admin".to_string()
}

/// Outgoing email settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProviderConfig,
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailProviderConfig {
    Resend {
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        use_tls: bool,
    },
}

impl AdminConfig {
    /// Fresh config with a newly generated signing key.
    pub fn generate(site: String, base_url: String) -> Self {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        AdminConfig {
            site,
            base_url,
            sender: default_sender(),
            signing_key: hex::encode(key),
            database_url: None,
            email: None,
        }
    }

    /// Load config from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from a custom path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to a custom path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Default config path (~/.lyceum/config.json)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lyceum")
            .join("config.json")
    }

    /// Signing key as bytes (32 bytes).
    pub fn signing_key_bytes(&self) -> Result<[u8; 32], String> {
        let bytes = hex::decode(&self.signing_key)
            .map_err(|e| format!("Invalid signing key hex: {}", e))?;
        bytes
            .try_into()
            .map_err(|_| "Signing key must be exactly 32 bytes".to_string())
    }
}
