// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types shared by every network family.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Network family a chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// EVM-compatible chain (EIP-155 replay protection)
    Evm,
    /// Solana cluster
    Solana,
    /// NEAR cluster
    Near,
}

impl ChainKind {
    /// Storage / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Evm => "evm",
            ChainKind::Solana => "solana",
            ChainKind::Near => "near",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(ChainKind::Evm),
            "solana" => Ok(ChainKind::Solana),
            "near" => Ok(ChainKind::Near),
            other => Err(format!("unknown chain kind `{other}`")),
        }
    }
}

/// Fungible-token standard supported by the faucet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TokenStandard {
    #[serde(rename = "ERC20")]
    Erc20,
}

impl FromStr for TokenStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERC20" => Ok(TokenStandard::Erc20),
            other => Err(format!("{other} not supported contract type")),
        }
    }
}

/// A fungible token hosted on one or more EVM chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Contract address, lower-cased
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub standard: TokenStandard,
    /// Decimal exponent used for ledger conversion
    pub decimals: u8,
    /// EVM chain ids the contract is deployed on (never empty)
    pub chains: BTreeSet<String>,
}

impl Token {
    /// Whether the token is deployed on the given EVM chain.
    pub fn supports(&self, chain_id: &str) -> bool {
        self.chains.contains(chain_id)
    }
}

/// Static parameters of one chain, fixed at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub id: String,
    pub name: String,
    pub rpc: String,
    pub native_token: String,
    pub decimals: u8,
}

/// Errors returned by chain operations.
///
/// Every remote failure surfaces here; nothing in the chain layer retries.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("RPC call timed out after {0}s")]
    Timeout(u64),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Operation not supported on {0} chains")]
    Unsupported(ChainKind),
}

impl ChainError {
    /// Whether the error stems from caller input rather than the remote node.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidAddress(_) | ChainError::AmountOutOfRange(_)
        )
    }
}
