// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The chain capability shared by every network family.
//!
//! A [`Chain`] owns a handle to one network's RPC endpoint and the signer of
//! its family. Dispatch code works against `Arc<dyn Chain>` only.

use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;

use super::types::{ChainError, ChainKind};

#[async_trait]
pub trait Chain: Send + Sync {
    /// Chain id (numeric string for EVM, cluster name for Solana / NEAR).
    fn id(&self) -> &str;

    fn kind(&self) -> ChainKind;

    fn name(&self) -> &str;

    /// Symbol of the native asset.
    fn native_token(&self) -> &str;

    /// Decimal exponent of the native asset.
    fn decimals(&self) -> u8;

    /// Address or account id of the signer sending from this chain.
    fn signer_address(&self) -> String;

    /// Whether `address` is a well-formed, non-system receiver on this network.
    fn validate_address(&self, address: &str) -> bool;

    /// Balance of `address` in minor units: native when `token` is `None`,
    /// otherwise the fungible-token balance held at that contract.
    async fn get_balance(&self, address: &str, token: Option<&str>) -> Result<U256, ChainError>;

    /// Symbol reported by a token contract.
    async fn token_symbol(&self, _token: &str) -> Result<String, ChainError> {
        Err(ChainError::Unsupported(self.kind()))
    }

    /// Decimals reported by a token contract.
    async fn token_decimals(&self, _token: &str) -> Result<u8, ChainError> {
        Err(ChainError::Unsupported(self.kind()))
    }

    /// Build, sign and submit a transfer of `amount` minor units to `to`.
    /// Returns the transaction hash.
    async fn send(&self, to: &str, amount: U256, token: Option<&str>) -> Result<String, ChainError>;
}

/// Bound a remote call by `limit`, mapping expiry to [`ChainError::Timeout`].
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ChainError>
where
    F: std::future::Future<Output = Result<T, ChainError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ChainError::Timeout(limit.as_secs()))?
}
