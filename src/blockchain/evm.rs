// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain client: balances, ERC-20 metadata and EIP-155 legacy transfers.
//!
//! Gas price, gas limit and the pending nonce are fetched from the node for
//! every send. With `serialize_submissions` off, two concurrent sends from
//! the same signer can read the same pending nonce and one of them will be
//! rejected by the node. With it on, sends on one chain are queued behind a
//! mutex held from nonce fetch to submission.

use std::future::IntoFuture;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, Bytes, TxKind, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::chain::{with_timeout, Chain};
use super::erc20::{Erc20Contract, IERC20};
use super::signing::EvmSigner;
use super::types::{ChainError, ChainKind, ChainParams};

/// Gas multiplier applied to ERC-20 transfer estimates.
const TOKEN_GAS_MULTIPLIER: u64 = 4;

/// `0x`-prefixed 20-byte hex address, excluding the zero address.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40
        && hex.bytes().all(|b| b.is_ascii_hexdigit())
        && hex.bytes().any(|b| b != b'0')
}

fn parse_address(address: &str) -> Result<Address, ChainError> {
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(format!("{address}: {e}")))
}

/// An EVM-compatible chain bound to the shared EVM signer.
pub struct EvmChain {
    params: ChainParams,
    chain_id: u64,
    provider: DynProvider,
    signer: Arc<EvmSigner>,
    timeout: Duration,
    submit_lock: Option<Mutex<()>>,
}

impl EvmChain {
    pub fn new(
        params: ChainParams,
        signer: Arc<EvmSigner>,
        timeout: Duration,
        serialize_submissions: bool,
    ) -> Result<Self, ChainError> {
        let chain_id = params
            .id
            .parse::<u64>()
            .map_err(|e| ChainError::InvalidChainId(format!("{}: {e}", params.id)))?;

        let url: url::Url = params
            .rpc
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(format!("{}: {e}", params.rpc)))?;

        // Nonce, gas and chain id are filled by hand before signing.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased();

        Ok(Self {
            params,
            chain_id,
            provider,
            signer,
            timeout,
            submit_lock: serialize_submissions.then(|| Mutex::new(())),
        })
    }

    /// Numeric EIP-155 chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Compare the configured chain id with the one the node reports.
    pub async fn verify_chain_id(&self) -> Result<(), ChainError> {
        let reported = self.rpc("eth_chainId", self.provider.get_chain_id()).await?;
        if reported != self.chain_id {
            return Err(ChainError::InvalidChainId(format!(
                "{} reports chain id {reported}, configured {}",
                self.params.rpc, self.chain_id
            )));
        }
        Ok(())
    }

    /// Await a provider call under the RPC timeout.
    async fn rpc<T, E, F>(&self, method: &str, call: F) -> Result<T, ChainError>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        with_timeout(self.timeout, async move {
            call.await
                .map_err(|e| ChainError::RpcError(format!("{method}: {e}")))
        })
        .await
    }

    async fn build_and_submit(
        &self,
        to: Address,
        amount: U256,
        token: Option<Address>,
    ) -> Result<String, ChainError> {
        let from = self.signer.address();

        let (target, value, input) = match token {
            Some(contract) => (
                contract,
                U256::ZERO,
                Bytes::from(IERC20::transferCall { to, amount }.abi_encode()),
            ),
            None => (to, amount, Bytes::new()),
        };

        let nonce = self
            .rpc(
                "eth_getTransactionCount",
                self.provider.get_transaction_count(from).pending(),
            )
            .await?;
        let gas_price = self.rpc("eth_gasPrice", self.provider.get_gas_price()).await?;

        let request = TransactionRequest::default()
            .from(from)
            .to(target)
            .value(value)
            .input(input.clone().into());
        let estimate = self.rpc("eth_estimateGas", self.provider.estimate_gas(request)).await?;
        let gas_limit = if token.is_some() {
            estimate.saturating_mul(TOKEN_GAS_MULTIPLIER)
        } else {
            estimate
        };

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(target),
            value,
            input,
        };

        let signature = self
            .signer
            .signer()
            .sign_transaction_sync(&mut tx)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let raw = envelope.encoded_2718();

        let pending = with_timeout(self.timeout, async {
            self.provider
                .send_raw_transaction(&raw)
                .await
                .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {e}")))
        })
        .await?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        tracing::debug!(
            chain_id = %self.params.id,
            nonce,
            gas_price,
            gas_limit,
            tx_hash = %tx_hash,
            "EVM transaction submitted"
        );
        Ok(tx_hash)
    }
}

#[async_trait]
impl Chain for EvmChain {
    fn id(&self) -> &str {
        &self.params.id
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Evm
    }

    fn name(&self) -> &str {
        &self.params.name
    }

    fn native_token(&self) -> &str {
        &self.params.native_token
    }

    fn decimals(&self) -> u8 {
        self.params.decimals
    }

    fn signer_address(&self) -> String {
        self.signer.address_string()
    }

    fn validate_address(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    async fn get_balance(&self, address: &str, token: Option<&str>) -> Result<U256, ChainError> {
        let holder = parse_address(address)?;
        match token {
            Some(token) => {
                let contract = Erc20Contract::new(&self.provider, parse_address(token)?);
                with_timeout(self.timeout, contract.balance_of(holder)).await
            }
            None => self.rpc("eth_getBalance", self.provider.get_balance(holder)).await,
        }
    }

    async fn token_symbol(&self, token: &str) -> Result<String, ChainError> {
        let contract = Erc20Contract::new(&self.provider, parse_address(token)?);
        with_timeout(self.timeout, contract.symbol()).await
    }

    async fn token_decimals(&self, token: &str) -> Result<u8, ChainError> {
        let contract = Erc20Contract::new(&self.provider, parse_address(token)?);
        with_timeout(self.timeout, contract.decimals()).await
    }

    async fn send(&self, to: &str, amount: U256, token: Option<&str>) -> Result<String, ChainError> {
        let to = parse_address(to)?;
        let token = token.map(parse_address).transpose()?;

        let _guard = match &self.submit_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        self.build_and_submit(to, amount, token).await
    }
}
