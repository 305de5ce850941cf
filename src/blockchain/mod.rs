// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the faucet.
//!
//! This module provides:
//! - The [`Chain`] capability and one implementation per network family
//!   (EVM, Solana, NEAR)
//! - Signers, one per family, shared by every chain of that family
//! - Chain and token registries
//! - Minor-unit amount parsing and human conversion

pub mod amount;
pub mod chain;
pub mod erc20;
pub mod evm;
pub mod near;
pub mod registry;
pub mod rpc;
pub mod signing;
pub mod solana;
pub mod types;

pub use chain::Chain;
pub use evm::EvmChain;
pub use near::NearChain;
pub use registry::{ChainRegistry, RegistryError, TokenRegistry};
pub use signing::{EvmSigner, NearSigner, SignerError, SignerSet, SolanaSigner};
pub use solana::SolanaChain;
pub use types::*;
