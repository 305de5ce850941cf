// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` or `Deserialize`, and `ToSchema`
//! for OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Send**: transfer requests per network family and the resulting hash
//! - **Chains / Tokens**: faucet inventory with the signer's balances
//! - **Balances**: the caller's cumulative payouts

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{ChainKind, TokenStandard};
use crate::storage::BalanceRecord;

// =============================================================================
// Send Models
// =============================================================================

/// Request body of `POST /v1/faucet/send/{kind}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SendRequest {
    /// Chain id: numeric EVM chain id, or the Solana / NEAR cluster id.
    pub chain_id: String,
    /// Receiver address (EVM hex, Solana base58) or NEAR account id.
    pub to: String,
    /// Amount in minor units (wei, lamports, yoctoNEAR) as a decimal string.
    #[schema(example = "1000000000000000")]
    pub amount: String,
    /// Asset symbol; must match the native token or the token contract.
    pub symbol: String,
    /// ERC-20 contract address (EVM only). Omit for the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
}

/// Successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SendResponse {
    pub tx_hash: String,
}

// =============================================================================
// Inventory Models
// =============================================================================

/// A chain the faucet dispenses on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ChainInfo {
    pub id: String,
    pub kind: ChainKind,
    pub name: String,
    pub native_token: String,
    pub decimals: u8,
    /// Faucet signer's native balance in human units.
    pub balance: f64,
}

/// A token the faucet dispenses, one entry per supporting chain.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TokenInfo {
    pub address: String,
    pub standard: TokenStandard,
    pub name: String,
    pub symbol: String,
    pub chain_id: String,
    pub chain_kind: ChainKind,
    /// Decimals reported by the contract.
    pub decimals: u8,
    /// Faucet signer's token balance in human units.
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainListResponse {
    pub chains: Vec<ChainInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenListResponse {
    pub tokens: Vec<TokenInfo>,
}

// =============================================================================
// Balance Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceListResponse {
    pub balances: Vec<BalanceRecord>,
}
