// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Dispatch
//!
//! [`Faucet`] ties the registries, the chains and the balance ledger together.
//! A transfer runs these steps, each of which may end the request:
//!
//! 1. parse a strictly positive minor-unit amount
//! 2. resolve the chain by `(kind, id)`
//! 3. validate the receiver and reject the faucet's own address
//! 4. resolve the asset: a registered token deployed on this chain whose
//!    on-chain symbol matches, or the chain's native token
//! 5. require the signer balance to exceed the amount
//! 6. send, then convert to human units and add to the caller's ledger row
//!
//! Nothing here retries. A send that succeeds but fails to reach the ledger
//! is logged with its transaction hash and reported as a storage error.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::blockchain::amount::{is_less_or_eq, parse_transfer_amount, to_human};
use crate::blockchain::{Chain, ChainError, ChainKind, ChainRegistry, TokenRegistry};
use crate::models::{ChainInfo, TokenInfo};
use crate::storage::{BalanceFilter, BalanceKey, BalanceRecord, BalancesQ, LedgerError};

/// Dispatch failures, by how the caller should treat them.
#[derive(Debug, thiserror::Error)]
pub enum FaucetError {
    /// Caller input is malformed or disallowed.
    #[error("{0}")]
    Validation(String),

    /// Unknown chain, or an asset the chain does not offer.
    #[error("{0}")]
    NotFound(String),

    /// A chain RPC call failed or timed out.
    #[error("remote chain unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("insufficient faucet balance on {kind} chain {chain_id}")]
    InsufficientBalance { kind: ChainKind, chain_id: String },

    #[error("ledger error: {0}")]
    Storage(#[from] LedgerError),
}

impl From<ChainError> for FaucetError {
    fn from(e: ChainError) -> Self {
        if e.is_validation() {
            FaucetError::Validation(e.to_string())
        } else {
            FaucetError::RemoteUnavailable(e.to_string())
        }
    }
}

/// One transfer, as received from a network-family endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub kind: ChainKind,
    pub chain_id: String,
    pub to: String,
    /// Minor units as a decimal digit string.
    pub amount: String,
    pub symbol: String,
    pub token_address: Option<String>,
}

/// Multi-chain transfer engine.
pub struct Faucet {
    chains: ChainRegistry,
    tokens: TokenRegistry,
    ledger: Arc<dyn BalancesQ>,
}

impl Faucet {
    pub fn new(chains: ChainRegistry, tokens: TokenRegistry, ledger: Arc<dyn BalancesQ>) -> Self {
        Self {
            chains,
            tokens,
            ledger,
        }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn ledger(&self) -> &Arc<dyn BalancesQ> {
        &self.ledger
    }

    /// Send `request` on behalf of `user_id` and record the payout.
    /// Returns the transaction hash.
    pub async fn dispatch(&self, user_id: &str, request: &TransferRequest) -> Result<String, FaucetError> {
        let amount = parse_transfer_amount(&request.amount).map_err(|e| {
            tracing::warn!(user_id, amount = %request.amount, error = %e, "Invalid transfer amount");
            FaucetError::Validation(e.to_string())
        })?;

        let chain = self.chains.get(request.kind, &request.chain_id).ok_or_else(|| {
            tracing::warn!(chain_kind = %request.kind, chain_id = %request.chain_id, "Unsupported chain");
            FaucetError::NotFound(format!(
                "unsupported {} chain `{}`",
                request.kind, request.chain_id
            ))
        })?;

        self.check_receiver(chain.as_ref(), &request.to)?;

        let token = self.resolve_asset(chain.as_ref(), request).await?;

        let balance = chain
            .get_balance(&chain.signer_address(), token.map(|(address, _)| address))
            .await
            .map_err(|e| {
                tracing::error!(chain_id = %chain.id(), error = %e, "Failed to get faucet balance");
                FaucetError::from(e)
            })?;
        if is_less_or_eq(&balance, &amount) {
            tracing::error!(
                chain_kind = %chain.kind(),
                chain_id = %chain.id(),
                balance = %balance,
                amount = %amount,
                "Insufficient faucet balance"
            );
            return Err(FaucetError::InsufficientBalance {
                kind: chain.kind(),
                chain_id: chain.id().to_string(),
            });
        }

        let tx_hash = chain
            .send(&request.to, amount, token.map(|(address, _)| address))
            .await
            .map_err(|e| {
                tracing::error!(chain_id = %chain.id(), error = %e, "Failed to send transaction");
                FaucetError::from(e)
            })?;

        tracing::info!(
            user_id,
            chain_kind = %chain.kind(),
            chain_id = %chain.id(),
            tx_hash = %tx_hash,
            "Transfer submitted"
        );

        let decimals = token.map_or(chain.decimals(), |(_, decimals)| decimals);
        self.record_payout(user_id, chain.as_ref(), token.map(|(address, _)| address), amount, decimals, &tx_hash)
            .await?;

        Ok(tx_hash)
    }

    /// Validate the receiver against the chain's address rule and the signer.
    fn check_receiver(&self, chain: &dyn Chain, to: &str) -> Result<(), FaucetError> {
        if !chain.validate_address(to) {
            tracing::warn!(chain_id = %chain.id(), to, "Invalid receiver address");
            return Err(FaucetError::Validation(format!("invalid receiver address `{to}`")));
        }
        let signer = chain.signer_address();
        let is_signer = match chain.kind() {
            ChainKind::Evm => to.eq_ignore_ascii_case(&signer),
            ChainKind::Solana | ChainKind::Near => to == signer,
        };
        if is_signer {
            tracing::warn!(chain_id = %chain.id(), to, "Receiver is the faucet signer");
            return Err(FaucetError::Validation(
                "receiver can't be equal to the faucet address".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the requested asset. Returns `Some((token address, decimals))`
    /// for a token, `None` for the native asset.
    async fn resolve_asset<'a>(
        &'a self,
        chain: &dyn Chain,
        request: &TransferRequest,
    ) -> Result<Option<(&'a str, u8)>, FaucetError> {
        let Some(token_address) = request.token_address.as_deref() else {
            if chain.native_token() != request.symbol {
                tracing::warn!(chain_id = %chain.id(), symbol = %request.symbol, "Unsupported symbol for this chain");
                return Err(FaucetError::NotFound(format!(
                    "symbol `{}` is not offered on chain `{}`",
                    request.symbol,
                    chain.id()
                )));
            }
            return Ok(None);
        };

        let token = self
            .tokens
            .get(token_address)
            .filter(|token| chain.kind() == ChainKind::Evm && token.supports(chain.id()))
            .ok_or_else(|| {
                tracing::warn!(chain_id = %chain.id(), token_address, "Unsupported token on this chain");
                FaucetError::NotFound(format!(
                    "token `{token_address}` is not offered on chain `{}`",
                    chain.id()
                ))
            })?;

        let symbol = chain.token_symbol(&token.address).await.map_err(|e| {
            tracing::error!(chain_id = %chain.id(), token_address = %token.address, error = %e, "Failed to get token symbol");
            FaucetError::from(e)
        })?;
        if symbol != request.symbol {
            tracing::warn!(
                chain_id = %chain.id(),
                token_address = %token.address,
                expected = %symbol,
                requested = %request.symbol,
                "Symbol does not match token"
            );
            return Err(FaucetError::Validation(format!(
                "invalid symbol `{}` for token `{}`",
                request.symbol, token.address
            )));
        }

        Ok(Some((token.address.as_str(), token.decimals)))
    }

    async fn record_payout(
        &self,
        user_id: &str,
        chain: &dyn Chain,
        token: Option<&str>,
        amount: U256,
        decimals: u8,
        tx_hash: &str,
    ) -> Result<(), FaucetError> {
        let key = BalanceKey::new(user_id, chain.id(), chain.kind(), token);
        let delta = to_human(amount, decimals);

        self.ledger.update_or_create(&key, delta).await.map_err(|e| {
            tracing::error!(
                user_id,
                chain_id = %chain.id(),
                tx_hash,
                error = %e,
                "Transfer sent but ledger update failed"
            );
            FaucetError::Storage(e)
        })?;
        Ok(())
    }

    /// Ledger rows of `user_id`, one per (chain, asset) ever paid out.
    pub async fn balances(&self, user_id: &str) -> Result<Vec<BalanceRecord>, FaucetError> {
        let mut records = self
            .ledger
            .list(&BalanceFilter::new().by_user_id(user_id))
            .await?;
        records.sort_by(|a, b| {
            (a.chain_kind, &a.chain_id, &a.token_address).cmp(&(b.chain_kind, &b.chain_id, &b.token_address))
        });
        Ok(records)
    }

    /// Every registered chain with the signer's native balance.
    pub async fn chain_list(&self) -> Result<Vec<ChainInfo>, FaucetError> {
        let mut out = Vec::with_capacity(self.chains.len());
        for chain in self.chains.iter() {
            let balance = chain
                .get_balance(&chain.signer_address(), None)
                .await
                .map_err(|e| {
                    tracing::error!(chain_kind = %chain.kind(), chain_id = %chain.id(), error = %e, "Failed to get faucet balance");
                    FaucetError::from(e)
                })?;

            out.push(ChainInfo {
                id: chain.id().to_string(),
                kind: chain.kind(),
                name: chain.name().to_string(),
                native_token: chain.native_token().to_string(),
                decimals: chain.decimals(),
                balance: to_human(balance, chain.decimals()),
            });
        }
        Ok(out)
    }

    /// Every registered token on each registered chain that hosts it, with the
    /// signer's token balance.
    pub async fn token_list(&self) -> Result<Vec<TokenInfo>, FaucetError> {
        let mut out = Vec::new();
        for token in self.tokens.iter() {
            for chain_id in &token.chains {
                let Some(chain) = self.chains.get(ChainKind::Evm, chain_id) else {
                    continue;
                };

                let fetch = async {
                    let balance = chain
                        .get_balance(&chain.signer_address(), Some(&token.address))
                        .await?;
                    let decimals = chain.token_decimals(&token.address).await?;
                    Ok::<_, ChainError>((balance, decimals))
                };
                let (balance, decimals) = fetch.await.map_err(|e| {
                    tracing::error!(chain_id = %chain_id, token_address = %token.address, error = %e, "Failed to get token balance");
                    FaucetError::from(e)
                })?;

                out.push(TokenInfo {
                    address: token.address.clone(),
                    standard: token.standard,
                    name: token.name.clone(),
                    symbol: token.symbol.clone(),
                    chain_id: chain_id.clone(),
                    chain_kind: ChainKind::Evm,
                    decimals,
                    balance: to_human(balance, decimals),
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Token, TokenStandard};
    use crate::storage::BalanceDb;
    use crate::test_support::{MockChain, MockLedger, MOCK_SIGNER};

    const RECEIVER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const USDC: &str = "0x5425890298aed601595a70ab815c96711a31bc65";

    fn usdc() -> Token {
        Token {
            address: USDC.to_string(),
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
            standard: TokenStandard::Erc20,
            decimals: 6,
            chains: ["1".to_string()].into_iter().collect(),
        }
    }

    fn native_request(amount: &str) -> TransferRequest {
        TransferRequest {
            kind: ChainKind::Evm,
            chain_id: "1".to_string(),
            to: RECEIVER.to_string(),
            amount: amount.to_string(),
            symbol: "ETH".to_string(),
            token_address: None,
        }
    }

    fn faucet_with(chain: Arc<MockChain>, ledger: Arc<dyn BalancesQ>) -> Faucet {
        let mut chains = ChainRegistry::new();
        chains.insert(chain).unwrap();
        let mut tokens = TokenRegistry::new();
        tokens.insert(usdc()).unwrap();
        Faucet::new(chains, tokens, ledger)
    }

    fn temp_ledger() -> (Arc<BalanceDb>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = BalanceDb::open(&dir.path().join("ledger.redb")).unwrap();
        (Arc::new(db), dir)
    }

    async fn ledger_amount(ledger: &BalanceDb, token: Option<&str>) -> Option<f64> {
        let key = BalanceKey::new("user-1", "1", ChainKind::Evm, token);
        ledger
            .get(&BalanceFilter::from(&key))
            .await
            .unwrap()
            .map(|r| r.amount)
    }

    #[tokio::test]
    async fn native_transfer_records_new_ledger_row() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(0).with_balance(10));
        let (ledger, _dir) = temp_ledger();
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let tx_hash = faucet.dispatch("user-1", &native_request("4")).await.unwrap();

        assert!(!tx_hash.is_empty());
        assert_eq!(chain.sent(), vec![(RECEIVER.to_string(), U256::from(4u64), None)]);
        assert_eq!(ledger_amount(&ledger, None).await, Some(4.0));
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_before_any_chain_call() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(0).with_balance(10));
        let ledger = Arc::new(MockLedger::default());
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let err = faucet.dispatch("user-1", &native_request("0")).await.unwrap_err();

        assert!(matches!(err, FaucetError::Validation(_)));
        assert_eq!(chain.calls(), 0);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn unknown_chain_is_not_found() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let ledger = Arc::new(MockLedger::default());
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let mut request = native_request("4");
        request.chain_id = "137".to_string();
        let err = faucet.dispatch("user-1", &request).await.unwrap_err();

        assert!(matches!(err, FaucetError::NotFound(_)));
        assert_eq!(chain.calls(), 0);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn chain_lookup_is_scoped_by_kind() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let faucet = faucet_with(chain, Arc::new(MockLedger::default()));

        let mut request = native_request("4");
        request.kind = ChainKind::Near;
        let err = faucet.dispatch("user-1", &request).await.unwrap_err();
        assert!(matches!(err, FaucetError::NotFound(_)));
    }

    #[tokio::test]
    async fn token_symbol_mismatch_fails_before_building_transaction() {
        let chain = Arc::new(
            MockChain::evm("1")
                .with_balance(1_000_000_000)
                .with_token(USDC, "USDC.e", 6),
        );
        let ledger = Arc::new(MockLedger::default());
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let mut request = native_request("5");
        request.symbol = "USDC".to_string();
        request.token_address = Some(USDC.to_string());
        let err = faucet.dispatch("user-1", &request).await.unwrap_err();

        assert!(matches!(err, FaucetError::Validation(_)));
        assert!(chain.sent().is_empty());
        assert_eq!(chain.balance_queries(), 0);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn token_transfer_uses_token_decimals_for_ledger() {
        let chain = Arc::new(
            MockChain::evm("1")
                .with_balance(1)
                .with_token(USDC, "USDC", 6)
                .with_token_balance(5_000_000),
        );
        let (ledger, _dir) = temp_ledger();
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let mut request = native_request("1500000");
        request.symbol = "USDC".to_string();
        request.token_address = Some("0x5425890298AED601595A70AB815C96711A31BC65".to_string());
        faucet.dispatch("user-1", &request).await.unwrap();

        assert_eq!(
            chain.sent(),
            vec![(RECEIVER.to_string(), U256::from(1_500_000u64), Some(USDC.to_string()))]
        );
        assert_eq!(ledger_amount(&ledger, Some(USDC)).await, Some(1.5));
        assert_eq!(ledger_amount(&ledger, None).await, None);
    }

    #[tokio::test]
    async fn token_not_deployed_on_chain_is_not_found() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let faucet = faucet_with(chain, Arc::new(MockLedger::default()));

        let mut request = native_request("1");
        request.symbol = "DAI".to_string();
        request.token_address = Some("0x6b175474e89094c44da98b954eedeac495271d0f".to_string());
        let err = faucet.dispatch("user-1", &request).await.unwrap_err();
        assert!(matches!(err, FaucetError::NotFound(_)));
    }

    #[tokio::test]
    async fn wrong_native_symbol_is_not_found() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let faucet = faucet_with(chain, Arc::new(MockLedger::default()));

        let mut request = native_request("1");
        request.symbol = "AVAX".to_string();
        let err = faucet.dispatch("user-1", &request).await.unwrap_err();
        assert!(matches!(err, FaucetError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_or_self_receiver_is_validation_error() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let faucet = faucet_with(chain.clone(), Arc::new(MockLedger::default()));

        let mut request = native_request("1");
        request.to = "0x1234".to_string();
        assert!(matches!(
            faucet.dispatch("user-1", &request).await,
            Err(FaucetError::Validation(_))
        ));

        request.to = MOCK_SIGNER.to_uppercase().replacen("0X", "0x", 1);
        assert!(matches!(
            faucet.dispatch("user-1", &request).await,
            Err(FaucetError::Validation(_))
        ));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn solana_receiver_comparison_is_case_sensitive() {
        let chain = Arc::new(MockChain::solana("devnet").with_balance(10));
        let faucet = faucet_with(chain.clone(), Arc::new(MockLedger::default()));

        let mut request = TransferRequest {
            kind: ChainKind::Solana,
            chain_id: "devnet".to_string(),
            to: chain.signer_address(),
            amount: "1".to_string(),
            symbol: "SOL".to_string(),
            token_address: None,
        };
        assert!(matches!(
            faucet.dispatch("user-1", &request).await,
            Err(FaucetError::Validation(_))
        ));

        // Same letters as the signer, one differing in case: another key.
        request.to = "9wzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".to_string();
        faucet.dispatch("user-1", &request).await.unwrap();
        assert_eq!(chain.sent().len(), 1);
    }

    #[tokio::test]
    async fn balance_equal_to_amount_is_insufficient() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(0).with_balance(4));
        let ledger = Arc::new(MockLedger::default());
        let faucet = faucet_with(chain.clone(), ledger.clone());

        let err = faucet.dispatch("user-1", &native_request("4")).await.unwrap_err();
        assert!(matches!(err, FaucetError::InsufficientBalance { .. }));
        assert!(chain.sent().is_empty());
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn send_failure_is_remote_unavailable_and_not_recorded() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10).failing_sends());
        let ledger = Arc::new(MockLedger::default());
        let faucet = faucet_with(chain, ledger.clone());

        let err = faucet.dispatch("user-1", &native_request("4")).await.unwrap_err();
        assert!(matches!(err, FaucetError::RemoteUnavailable(_)));
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn ledger_failure_after_send_is_storage_error() {
        let chain = Arc::new(MockChain::evm("1").with_balance(10));
        let ledger = Arc::new(MockLedger::failing());
        let faucet = faucet_with(chain.clone(), ledger);

        let err = faucet.dispatch("user-1", &native_request("4")).await.unwrap_err();
        assert!(matches!(err, FaucetError::Storage(_)));
        assert_eq!(chain.sent().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_transfers_sum_in_ledger() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(0).with_balance(100));
        let (ledger, _dir) = temp_ledger();
        let faucet = Arc::new(faucet_with(chain, ledger.clone()));

        let a = {
            let faucet = faucet.clone();
            tokio::spawn(async move { faucet.dispatch("user-1", &native_request("3")).await })
        };
        let b = {
            let faucet = faucet.clone();
            tokio::spawn(async move { faucet.dispatch("user-1", &native_request("5")).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(ledger_amount(&ledger, None).await, Some(8.0));
        let rows = ledger.list(&BalanceFilter::new().by_user_id("user-1")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn chain_list_reports_human_balances() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(2).with_balance(1_050));
        let faucet = faucet_with(chain, Arc::new(MockLedger::default()));

        let list = faucet.chain_list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "1");
        assert_eq!(list[0].native_token, "ETH");
        assert_eq!(list[0].balance, 10.5);
    }

    #[tokio::test]
    async fn token_list_uses_contract_decimals() {
        let chain = Arc::new(
            MockChain::evm("1")
                .with_token(USDC, "USDC", 6)
                .with_token_balance(2_500_000),
        );
        let faucet = faucet_with(chain, Arc::new(MockLedger::default()));

        let list = faucet.token_list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].address, USDC);
        assert_eq!(list[0].decimals, 6);
        assert_eq!(list[0].balance, 2.5);
    }

    #[tokio::test]
    async fn balances_lists_only_the_callers_rows() {
        let chain = Arc::new(MockChain::evm("1").with_decimals(0).with_balance(100));
        let (ledger, _dir) = temp_ledger();
        let faucet = faucet_with(chain, ledger);

        faucet.dispatch("user-1", &native_request("3")).await.unwrap();
        faucet.dispatch("user-2", &native_request("7")).await.unwrap();

        let rows = faucet.balances("user-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "user-1");
        assert_eq!(rows[0].amount, 3.0);
        assert!(faucet.balances("nobody").await.unwrap().is_empty());
    }
}
