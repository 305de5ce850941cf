// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain and ledger doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::blockchain::{evm, near, solana, Chain, ChainError, ChainKind};
use crate::storage::{
    BalanceFilter, BalanceKey, BalanceRecord, BalancesQ, LedgerError, LedgerResult,
};

/// Address every EVM mock chain reports as its signer.
pub const MOCK_SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

type Sent = (String, U256, Option<String>);

/// Scriptable [`Chain`] recording every call it receives.
pub struct MockChain {
    id: String,
    kind: ChainKind,
    name: String,
    native_token: String,
    decimals: u8,
    signer: String,
    balance: U256,
    token_balance: U256,
    tokens: HashMap<String, (String, u8)>,
    fail_sends: bool,
    calls: AtomicUsize,
    balance_queries: AtomicUsize,
    sent: Mutex<Vec<Sent>>,
}

impl MockChain {
    fn new(kind: ChainKind, id: &str, native_token: &str, decimals: u8, signer: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: format!("{kind} {id}"),
            native_token: native_token.to_string(),
            decimals,
            signer: signer.to_string(),
            balance: U256::ZERO,
            token_balance: U256::ZERO,
            tokens: HashMap::new(),
            fail_sends: false,
            calls: AtomicUsize::new(0),
            balance_queries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn evm(id: &str) -> Self {
        Self::new(ChainKind::Evm, id, "ETH", 18, MOCK_SIGNER)
    }

    pub fn solana(id: &str) -> Self {
        Self::new(
            ChainKind::Solana,
            id,
            "SOL",
            9,
            "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
        )
    }

    pub fn near(id: &str) -> Self {
        Self::new(ChainKind::Near, id, "NEAR", 24, "faucet.testnet")
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Signer native balance in minor units.
    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = U256::from(balance);
        self
    }

    /// Signer balance reported for every token contract.
    pub fn with_token_balance(mut self, balance: u64) -> Self {
        self.token_balance = U256::from(balance);
        self
    }

    /// Register a token contract reporting `symbol` and `decimals`.
    pub fn with_token(mut self, address: &str, symbol: &str, decimals: u8) -> Self {
        self.tokens
            .insert(address.to_lowercase(), (symbol.to_string(), decimals));
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Number of async (remote) calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn token(&self, address: &str) -> Result<&(String, u8), ChainError> {
        self.tokens
            .get(&address.to_lowercase())
            .ok_or_else(|| ChainError::ContractError(format!("no contract at {address}")))
    }
}

#[async_trait]
impl Chain for MockChain {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ChainKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn native_token(&self) -> &str {
        &self.native_token
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn signer_address(&self) -> String {
        self.signer.clone()
    }

    fn validate_address(&self, address: &str) -> bool {
        match self.kind {
            ChainKind::Evm => evm::is_valid_address(address),
            ChainKind::Solana => solana::is_valid_address(address),
            ChainKind::Near => near::is_valid_account_id(address),
        }
    }

    async fn get_balance(&self, _address: &str, token: Option<&str>) -> Result<U256, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        match token {
            Some(token) => self.token(token).map(|_| self.token_balance),
            None => Ok(self.balance),
        }
    }

    async fn token_symbol(&self, token: &str) -> Result<String, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token(token).map(|(symbol, _)| symbol.clone())
    }

    async fn token_decimals(&self, token: &str) -> Result<u8, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token(token).map(|(_, decimals)| *decimals)
    }

    async fn send(&self, to: &str, amount: U256, token: Option<&str>) -> Result<String, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends {
            return Err(ChainError::TransactionFailed("nonce too low".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), amount, token.map(str::to_string)));
        Ok(format!("0x{:064x}", sent.len()))
    }
}

/// In-memory [`BalancesQ`] counting writes.
#[derive(Default)]
pub struct MockLedger {
    records: Mutex<HashMap<BalanceKey, BalanceRecord>>,
    writes: AtomicUsize,
    fail: bool,
}

impl MockLedger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> LedgerResult<()> {
        if self.fail {
            return Err(LedgerError::Storage("database is locked".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BalancesQ for MockLedger {
    async fn get(&self, filter: &BalanceFilter) -> LedgerResult<Option<BalanceRecord>> {
        self.check()?;
        let records = self.records.lock().unwrap();
        Ok(records.values().find(|r| filter.matches(r)).cloned())
    }

    async fn list(&self, filter: &BalanceFilter) -> LedgerResult<Vec<BalanceRecord>> {
        self.check()?;
        let records = self.records.lock().unwrap();
        Ok(records.values().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn create(&self, record: BalanceRecord) -> LedgerResult<()> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let key = record.key();
        if records.contains_key(&key) {
            return Err(LedgerError::Duplicate);
        }
        records.insert(key, record);
        Ok(())
    }

    async fn increment(&self, key: &BalanceKey, delta: f64) -> LedgerResult<BalanceRecord> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(key).ok_or(LedgerError::NotFound)?;
        record.amount += delta;
        Ok(record.clone())
    }
}
