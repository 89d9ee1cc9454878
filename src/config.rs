// src/config.rs

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DOCS_URL: &str = "https://docs.somnia.network/";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

lazy_static! {
    pub static ref ADDRESS_REGEX: Regex = Regex::new(r"^(0x)?[0-9a-fA-F]{40}$").unwrap();
    pub static ref TXID_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap();
    static ref SECRET_KEY_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap();
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AGENT_SECRET_KEY is not set in environment variables. Please check your .env file.")]
    MissingSecretKey,
    #[error("Invalid AGENT_SECRET_KEY format. Expected 0x followed by 64 hex characters, got: {prefix}...")]
    InvalidSecretKey { prefix: String },
    #[error("PORT must be a valid number, got '{0}'")]
    InvalidPort(String),
    #[error("could not determine the home directory; set WALLET_DATA_DIR")]
    NoHomeDir,
}

/// Which Somnia deployment the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// `MAINNET` selects mainnet; anything else means testnet.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("MAINNET") => Self::Mainnet,
            _ => Self::Testnet,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "MAINNET",
            Self::Testnet => "TESTNET",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mainnet => "Mainnet",
            Self::Testnet => "Testnet",
        }
    }

    pub fn chain(&self) -> ChainConfig {
        match self {
            Self::Mainnet => ChainConfig {
                network: *self,
                name: "Somnia Mainnet",
                chain_id: 5031,
                rpc_url: "https://api.infra.mainnet.somnia.network/".to_string(),
                explorer_url: "https://somniascan.io",
                currency_symbol: "STT",
                decimals: 18,
            },
            Self::Testnet => ChainConfig {
                network: *self,
                name: "Somnia Testnet",
                chain_id: 50312,
                rpc_url: "https://dream-rpc.somnia.network/".to_string(),
                explorer_url: "https://testnet.somniascan.io",
                currency_symbol: "STT",
                decimals: 18,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub network: Network,
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: &'static str,
    pub currency_symbol: &'static str,
    pub decimals: u8,
}

/// Everything the server needs, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub use_streamable_http: bool,
    pub port: u16,
    pub host: String,
    pub network: Network,
    pub chain: ChainConfig,
    pub agent_secret_key: SecretString,
    pub brave_api_key: Option<SecretString>,
    pub telegram_bot_token: Option<SecretString>,
    pub telegram_chat_id: Option<String>,
    pub wallet_data_dir: PathBuf,
    pub docs_mcp_enabled: bool,
    pub docs_url: String,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let agent_secret_key = non_empty("AGENT_SECRET_KEY").ok_or(ConfigError::MissingSecretKey)?;
        validate_secret_key(&agent_secret_key)?;

        let port = match non_empty("PORT") {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => DEFAULT_PORT,
        };

        let network = Network::from_env_value(lookup("ENVIRONMENT").as_deref());

        let wallet_data_dir = match non_empty("WALLET_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_wallet_dir()?,
        };

        Ok(Self {
            use_streamable_http: lookup("USE_STREAMABLE_HTTP").as_deref() == Some("true"),
            port,
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            network,
            chain: network.chain(),
            agent_secret_key: SecretString::new(agent_secret_key),
            brave_api_key: non_empty("BRAVE_API_KEY").map(SecretString::new),
            telegram_bot_token: non_empty("TELEGRAM_BOT_TOKEN").map(SecretString::new),
            telegram_chat_id: non_empty("TELEGRAM_CHAT_ID"),
            wallet_data_dir,
            docs_mcp_enabled: lookup("SOMNIA_DOCS_MCP").as_deref() == Some("true"),
            docs_url: non_empty("SOMNIA_DOCS_URL").unwrap_or_else(|| DEFAULT_DOCS_URL.to_string()),
        })
    }

    pub fn secret_key(&self) -> &str {
        self.agent_secret_key.expose_secret()
    }
}

fn validate_secret_key(key: &str) -> Result<(), ConfigError> {
    if SECRET_KEY_REGEX.is_match(key) {
        return Ok(());
    }
    Err(ConfigError::InvalidSecretKey {
        prefix: key.chars().take(10).collect(),
    })
}

/// `~/.somnia-agent/wallets`
pub fn default_wallet_dir() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    path.push(".somnia-agent");
    path.push("wallets");
    Ok(path)
}
