// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Faucet Server - Multi-Chain Custodial Faucet
//!
//! Dispatches small transfers from custodial signers on EVM chains, a Solana
//! cluster and a NEAR cluster, and records the cumulative amount each
//! authenticated user has received.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Delegated bearer-token authentication (doorman)
//! - `blockchain` - Chain capability, EVM / Solana / NEAR clients, signers
//! - `faucet` - Transfer dispatch
//! - `loader` - Start-up construction of signers and registries
//! - `storage` - Balance ledger (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod faucet;
pub mod loader;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
