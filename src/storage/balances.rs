// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance ledger: cumulative amount paid to each user per chain and token.
//!
//! Records are unique on `(user_id, chain_id, chain_kind, token_address)`.
//! The native asset of a chain uses the empty token address.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::ChainKind;

/// Token address sentinel for a chain's native asset.
pub const NATIVE_TOKEN_ADDRESS: &str = "";

/// Unique key of a ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub user_id: String,
    pub chain_id: String,
    pub chain_kind: ChainKind,
    pub token_address: String,
}

impl BalanceKey {
    /// Key for `token` on a chain, `None` meaning the native asset.
    pub fn new(user_id: &str, chain_id: &str, chain_kind: ChainKind, token: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            chain_id: chain_id.to_string(),
            chain_kind,
            token_address: token.map(str::to_lowercase).unwrap_or_default(),
        }
    }
}

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceRecord {
    pub user_id: String,
    pub chain_id: String,
    pub chain_kind: ChainKind,
    /// Empty for the native asset
    pub token_address: String,
    /// Cumulative human-unit amount
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BalanceRecord {
    /// Fresh record holding `amount`.
    pub fn new(key: BalanceKey, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            user_id: key.user_id,
            chain_id: key.chain_id,
            chain_kind: key.chain_kind,
            token_address: key.token_address,
            amount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey {
            user_id: self.user_id.clone(),
            chain_id: self.chain_id.clone(),
            chain_kind: self.chain_kind,
            token_address: self.token_address.clone(),
        }
    }
}

/// Conjunctive filter; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceFilter {
    pub user_id: Option<String>,
    pub chain_id: Option<String>,
    pub chain_kind: Option<ChainKind>,
    pub token_address: Option<String>,
}

impl BalanceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn by_chain_id(mut self, chain_id: &str) -> Self {
        self.chain_id = Some(chain_id.to_string());
        self
    }

    pub fn by_chain_kind(mut self, chain_kind: ChainKind) -> Self {
        self.chain_kind = Some(chain_kind);
        self
    }

    pub fn by_token_address(mut self, token_address: &str) -> Self {
        self.token_address = Some(token_address.to_lowercase());
        self
    }

    /// The exact key, when every field is set.
    pub fn as_key(&self) -> Option<BalanceKey> {
        Some(BalanceKey {
            user_id: self.user_id.clone()?,
            chain_id: self.chain_id.clone()?,
            chain_kind: self.chain_kind?,
            token_address: self.token_address.clone()?,
        })
    }

    pub fn matches(&self, record: &BalanceRecord) -> bool {
        self.user_id.as_ref().is_none_or(|v| *v == record.user_id)
            && self.chain_id.as_ref().is_none_or(|v| *v == record.chain_id)
            && self.chain_kind.is_none_or(|v| v == record.chain_kind)
            && self
                .token_address
                .as_ref()
                .is_none_or(|v| *v == record.token_address)
    }
}

impl From<&BalanceKey> for BalanceFilter {
    fn from(key: &BalanceKey) -> Self {
        Self {
            user_id: Some(key.user_id.clone()),
            chain_id: Some(key.chain_id.clone()),
            chain_kind: Some(key.chain_kind),
            token_address: Some(key.token_address.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Unique-key violation on create; callers retry as an increment.
    #[error("balance record already exists")]
    Duplicate,

    #[error("balance record not found")]
    NotFound,

    #[error("ledger storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Narrow query interface over the balance store.
#[async_trait]
pub trait BalancesQ: Send + Sync {
    /// First record matching `filter`.
    async fn get(&self, filter: &BalanceFilter) -> LedgerResult<Option<BalanceRecord>>;

    /// All records matching `filter`.
    async fn list(&self, filter: &BalanceFilter) -> LedgerResult<Vec<BalanceRecord>>;

    /// Insert a new record; [`LedgerError::Duplicate`] if its key exists.
    async fn create(&self, record: BalanceRecord) -> LedgerResult<()>;

    /// Add `delta` to an existing record in one atomic storage operation.
    async fn increment(&self, key: &BalanceKey, delta: f64) -> LedgerResult<BalanceRecord>;

    /// Create the record with `delta` or add `delta` to it.
    ///
    /// Concurrent first writers may both miss on the probe; the loser of the
    /// create sees `Duplicate` and falls back to the increment.
    async fn update_or_create(&self, key: &BalanceKey, delta: f64) -> LedgerResult<BalanceRecord> {
        if self.get(&BalanceFilter::from(key)).await?.is_some() {
            return self.increment(key, delta).await;
        }

        let record = BalanceRecord::new(key.clone(), delta);
        match self.create(record.clone()).await {
            Ok(()) => Ok(record),
            Err(LedgerError::Duplicate) => {
                tracing::debug!(
                    user_id = %key.user_id,
                    chain_id = %key.chain_id,
                    "Concurrent ledger create, retrying as increment"
                );
                self.increment(key, delta).await
            }
            Err(e) => Err(e),
        }
    }
}
