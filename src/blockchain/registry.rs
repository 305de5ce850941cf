// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain and token registries, built once at start-up and read-only after.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::chain::Chain;
use super::types::{ChainKind, Token};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate {kind} chain id `{id}`")]
    DuplicateChain { kind: ChainKind, id: String },

    #[error("Duplicate token address `{0}`")]
    DuplicateToken(String),
}

/// Chains keyed by `(kind, id)`.
#[derive(Default, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<(ChainKind, String), Arc<dyn Chain>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent; an existing `(kind, id)` is an error.
    pub fn insert(&mut self, chain: Arc<dyn Chain>) -> Result<(), RegistryError> {
        let key = (chain.kind(), chain.id().to_string());
        if self.chains.contains_key(&key) {
            return Err(RegistryError::DuplicateChain {
                kind: key.0,
                id: key.1,
            });
        }
        self.chains.insert(key, chain);
        Ok(())
    }

    pub fn get(&self, kind: ChainKind, id: &str) -> Option<Arc<dyn Chain>> {
        self.chains.get(&(kind, id.to_string())).cloned()
    }

    /// Chains in `(kind, id)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Chain>> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.chains.keys().map(|(kind, id)| format!("{kind}:{id}")))
            .finish()
    }
}

/// Tokens keyed by lower-cased contract address.
#[derive(Debug, Default, Clone)]
pub struct TokenRegistry {
    tokens: BTreeMap<String, Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent; addresses compare case-insensitively.
    pub fn insert(&mut self, mut token: Token) -> Result<(), RegistryError> {
        token.address = token.address.to_lowercase();
        if self.tokens.contains_key(&token.address) {
            return Err(RegistryError::DuplicateToken(token.address));
        }
        self.tokens.insert(token.address.clone(), token);
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&Token> {
        self.tokens.get(&address.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
