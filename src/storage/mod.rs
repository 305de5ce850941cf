// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage
//!
//! The faucet persists a single thing: the cumulative amount paid to each
//! user per `(chain_id, chain_kind, token_address)`. Dispatch code depends on
//! the [`BalancesQ`] interface only; [`BalanceDb`] implements it on redb.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb     # balances table
//! ```

pub mod balance_db;
pub mod balances;

pub use balance_db::BalanceDb;
pub use balances::{
    BalanceFilter, BalanceKey, BalanceRecord, BalancesQ, LedgerError, LedgerResult,
    NATIVE_TOKEN_ADDRESS,
};

/// Ledger file name under the data directory.
pub const LEDGER_FILE: &str = "ledger.redb";
