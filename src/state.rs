// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::DoormanClient;
use crate::faucet::Faucet;

#[derive(Clone)]
pub struct AppState {
    pub faucet: Arc<Faucet>,
    /// `None` when `DOORMAN_URL` is unset.
    pub doorman: Option<Arc<DoormanClient>>,
    /// Ledger directory, reported by the health check.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(faucet: Faucet, doorman: Option<DoormanClient>) -> Self {
        Self {
            faucet: Arc::new(faucet),
            doorman: doorman.map(Arc::new),
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }
}

#[cfg(test)]
impl AppState {
    /// No chains, no tokens, in-memory ledger, no doorman.
    pub fn for_tests() -> Self {
        use crate::blockchain::{ChainRegistry, TokenRegistry};
        use crate::test_support::MockLedger;

        Self::new(
            Faucet::new(
                ChainRegistry::new(),
                TokenRegistry::new(),
                Arc::new(MockLedger::default()),
            ),
            None,
        )
    }
}
