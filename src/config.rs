// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Process settings and signer secrets come from the environment; the network
//! layout (chains, tokens) comes from a JSON file. Both are read once at
//! startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FAUCET_CONFIG` | Path to the JSON network layout | `faucet.json` |
//! | `DATA_DIR` | Directory holding the balance ledger | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DOORMAN_URL` | Base URL of the delegated authenticator | Required for production |
//! | `RPC_TIMEOUT_SECS` | Bound on every chain RPC call | `15` |
//! | `EVM_SIGNER_KEY` | secp256k1 key, hex or PEM | Required with `evm` chains |
//! | `SOLANA_SIGNER_KEY` | base58 keypair / seed or JSON byte array | Required with `solana` |
//! | `NEAR_SIGNER_ACCOUNT` | NEAR account id of the faucet | Required with `near` |
//! | `NEAR_SIGNER_KEY` | `ed25519:<base58>` secret key | Required with `near` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Network Layout
//!
//! ```json
//! {
//!   "evm": {
//!     "serialize_submissions": true,
//!     "chains": [{ "chain_id": "43113", "name": "Avalanche Fuji", "rpc": "https://…", "native_token": "AVAX", "decimals": 18 }],
//!     "tokens": [{ "name": "USD Coin", "symbol": "USDC", "address": "0x…", "type": "ERC20", "decimals": 6, "chains": ["43113"] }]
//!   },
//!   "solana": { "id": "devnet", "rpc": "https://api.devnet.solana.com", "native_token": "SOL", "decimals": 9 },
//!   "near": { "id": "testnet", "rpc": "https://rpc.testnet.near.org", "native_token": "NEAR", "decimals": 24 }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::blockchain::{evm, ChainError, RegistryError, SignerError};

/// Environment variable name for the network layout file.
pub const FAUCET_CONFIG_ENV: &str = "FAUCET_CONFIG";

/// Default network layout path.
pub const DEFAULT_FAUCET_CONFIG: &str = "faucet.json";

/// Environment variable name for the ledger data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "/data";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable name for the doorman base URL.
///
/// When unset, send endpoints reject every request with 401 (or, with the
/// `dev` feature, accept the bearer token itself as the user id).
pub const DOORMAN_URL_ENV: &str = "DOORMAN_URL";

pub const RPC_TIMEOUT_SECS_ENV: &str = "RPC_TIMEOUT_SECS";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 15;

pub const EVM_SIGNER_KEY_ENV: &str = "EVM_SIGNER_KEY";
pub const SOLANA_SIGNER_KEY_ENV: &str = "SOLANA_SIGNER_KEY";
pub const NEAR_SIGNER_ACCOUNT_ENV: &str = "NEAR_SIGNER_ACCOUNT";
pub const NEAR_SIGNER_KEY_ENV: &str = "NEAR_SIGNER_KEY";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Errors raised while loading configuration. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid network layout: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("duplicate {what} `{value}`")]
    Duplicate { what: &'static str, value: String },

    #[error("invalid token `{address}`: {reason}")]
    InvalidToken { address: String, reason: String },

    #[error("{0} chains are configured but {1} is not set")]
    MissingSigner(&'static str, &'static str),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

// =============================================================================
// Network layout (JSON)
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct NetworkLayout {
    #[serde(default)]
    pub evm: EvmSection,
    #[serde(default)]
    pub solana: Option<ClusterConfig>,
    #[serde(default)]
    pub near: Option<ClusterConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EvmSection {
    #[serde(default)]
    pub chains: Vec<EvmChainConfig>,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    /// Queue sends per chain so concurrent requests never share a nonce.
    #[serde(default = "default_true")]
    pub serialize_submissions: bool,
}

impl Default for EvmSection {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            tokens: Vec::new(),
            serialize_submissions: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EvmChainConfig {
    pub chain_id: String,
    pub name: String,
    pub rpc: String,
    pub native_token: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub address: String,
    #[serde(rename = "type")]
    pub standard: String,
    pub decimals: u8,
    pub chains: Vec<String>,
}

/// A single Solana or NEAR cluster.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    pub id: String,
    pub rpc: String,
    pub native_token: String,
    pub decimals: u8,
    /// Display name; defaults to `"<Family> <id>"`.
    #[serde(default)]
    pub name: Option<String>,
}

impl NetworkLayout {
    /// Read and validate a layout file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let layout: Self = serde_json::from_str(raw)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Static checks that need no network access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut rpcs = HashSet::new();
        let mut names = HashSet::new();
        for chain in &self.evm.chains {
            unique(&mut ids, "evm chain id", &chain.chain_id)?;
            unique(&mut rpcs, "evm rpc", &chain.rpc)?;
            unique(&mut names, "evm chain name", &chain.name)?;
        }

        if let (Some(solana), Some(near)) = (&self.solana, &self.near) {
            if solana.rpc == near.rpc {
                return Err(ConfigError::Duplicate {
                    what: "cluster rpc",
                    value: solana.rpc.clone(),
                });
            }
        }

        let mut addresses = HashSet::new();
        for token in &self.evm.tokens {
            let address = token.address.to_lowercase();
            let invalid = |reason: String| ConfigError::InvalidToken {
                address: token.address.clone(),
                reason,
            };

            if !evm::is_valid_address(&address) {
                return Err(invalid("not a valid EVM address".to_string()));
            }
            token
                .standard
                .parse::<crate::blockchain::TokenStandard>()
                .map_err(invalid)?;
            if token.chains.is_empty() {
                return Err(invalid("no chains listed".to_string()));
            }
            unique(&mut addresses, "token address", &address)?;
        }

        Ok(())
    }
}

fn unique(seen: &mut HashSet<String>, what: &'static str, value: &str) -> Result<(), ConfigError> {
    if !seen.insert(value.to_string()) {
        return Err(ConfigError::Duplicate {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Environment
// =============================================================================

/// Signer secrets read from the environment. `Debug` never prints them.
#[derive(Clone, Default)]
pub struct SignerSecrets {
    pub evm_key: Option<String>,
    pub solana_key: Option<String>,
    pub near_account: Option<String>,
    pub near_key: Option<String>,
}

impl fmt::Debug for SignerSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("SignerSecrets")
            .field("evm_key", &set(&self.evm_key))
            .field("solana_key", &set(&self.solana_key))
            .field("near_account", &self.near_account)
            .field("near_key", &set(&self.near_key))
            .finish()
    }
}

/// Process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout_path: PathBuf,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub doorman_url: Option<String>,
    pub rpc_timeout: Duration,
    pub secrets: SignerSecrets,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match non_empty(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Env {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let rpc_timeout_secs = match non_empty(RPC_TIMEOUT_SECS_ENV) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Env {
                name: RPC_TIMEOUT_SECS_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_RPC_TIMEOUT_SECS,
        };
        if rpc_timeout_secs == 0 {
            return Err(ConfigError::Env {
                name: RPC_TIMEOUT_SECS_ENV,
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            layout_path: non_empty(FAUCET_CONFIG_ENV)
                .unwrap_or_else(|| DEFAULT_FAUCET_CONFIG.to_string())
                .into(),
            data_dir: non_empty(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            doorman_url: non_empty(DOORMAN_URL_ENV),
            rpc_timeout: Duration::from_secs(rpc_timeout_secs),
            secrets: SignerSecrets {
                evm_key: non_empty(EVM_SIGNER_KEY_ENV),
                solana_key: non_empty(SOLANA_SIGNER_KEY_ENV),
                near_account: non_empty(NEAR_SIGNER_ACCOUNT_ENV),
                near_key: non_empty(NEAR_SIGNER_KEY_ENV),
            },
        })
    }
}
