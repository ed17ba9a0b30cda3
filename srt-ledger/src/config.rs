//! Configuration for the ledger

use crate::amount::from_whole_tokens;
use crate::types::{Amount, MINT_SENTINEL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Token parameters (fixed at genesis)
    pub token: TokenConfig,

    /// Persistence configuration
    pub storage: StorageConfig,

    /// Writer actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "srt-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            token: TokenConfig::default(),
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Token parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Display name
    pub name: String,

    /// Ticker symbol
    pub symbol: String,

    /// Total supply minted at genesis, in whole tokens
    pub total_supply_tokens: u64,

    /// Address credited by the genesis entry
    pub genesis_address: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "SRT-BANK Token".to_string(),
            symbol: "SRT".to_string(),
            total_supply_tokens: 500_000_000, // 500 million
            genesis_address: "SRT-BANK-RESERVE".to_string(),
        }
    }
}

impl TokenConfig {
    /// Total supply in base units
    pub fn total_supply(&self) -> Amount {
        from_whole_tokens(self.total_supply_tokens)
    }
}

/// What to do when the ledger file exists but cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Refuse to open (default)
    Fail,
    /// Move the unreadable file aside and start a fresh genesis.
    /// Never applies to integrity failures.
    Quarantine,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger file (JSON array of blocks)
    pub ledger_file: PathBuf,

    /// Behaviour on an unparseable ledger file
    pub load_policy: LoadPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_file: PathBuf::from("./srt_ledger.json"),
            load_policy: LoadPolicy::Fail,
        }
    }
}

/// Writer actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure on writers)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(path) = std::env::var("SRT_LEDGER_FILE") {
            config.storage.ledger_file = PathBuf::from(path);
        }

        if let Ok(policy) = std::env::var("SRT_LEDGER_LOAD_POLICY") {
            config.storage.load_policy = match policy.as_str() {
                "fail" => LoadPolicy::Fail,
                "quarantine" => LoadPolicy::Quarantine,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown load policy: {}",
                        other
                    )))
                }
            };
        }

        if let Ok(capacity) = std::env::var("SRT_LEDGER_MAILBOX") {
            config.actor.mailbox_capacity = capacity
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid mailbox capacity: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let genesis = self.token.genesis_address.trim();
        if genesis.is_empty() || genesis == MINT_SENTINEL {
            return Err(crate::Error::Config(
                "genesis_address must be a non-empty, non-sentinel address".to_string(),
            ));
        }
        if self.token.total_supply_tokens == 0 {
            return Err(crate::Error::Config("total_supply_tokens must be positive".to_string()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox_capacity must be positive".to_string()));
        }
        Ok(())
    }
}
