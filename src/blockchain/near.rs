// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NEAR cluster client.
//!
//! A transfer is one borsh-serialized `Transaction` with a single `Transfer`
//! action, signed with ed25519 over its sha256 digest and submitted through
//! `broadcast_tx_commit`, which waits for the execution outcome.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::chain::Chain;
use super::rpc::JsonRpcClient;
use super::signing::NearSigner;
use super::types::{ChainError, ChainKind, ChainParams};

const MIN_ACCOUNT_ID_LEN: usize = 2;
const MAX_ACCOUNT_ID_LEN: usize = 64;
const ACCOUNT_SUFFIXES: [&str; 2] = [".testnet", ".near"];

/// borsh enum tags
const KEY_TYPE_ED25519: u8 = 0;
const ACTION_TRANSFER: u8 = 3;

/// Non-empty lowercase `[a-z0-9_-]` name, optionally suffixed `.testnet` /
/// `.near`, 2 to 64 characters overall.
pub fn is_valid_account_id(account_id: &str) -> bool {
    if account_id.len() < MIN_ACCOUNT_ID_LEN || account_id.len() > MAX_ACCOUNT_ID_LEN {
        return false;
    }

    let name = ACCOUNT_SUFFIXES
        .iter()
        .find_map(|suffix| account_id.strip_suffix(suffix))
        .unwrap_or(account_id);

    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Borsh writer covering the handful of types a transfer needs.
#[derive(Default)]
struct Borsh(Vec<u8>);

impl Borsh {
    fn string(&mut self, value: &str) -> &mut Self {
        self.0.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    fn u8(&mut self, value: u8) -> &mut Self {
        self.0.push(value);
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u64(&mut self, value: u64) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u128(&mut self, value: u128) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.0.extend_from_slice(value);
        self
    }
}

/// Fields of a single-transfer NEAR transaction.
#[derive(Debug, Clone)]
pub(crate) struct TransferTx<'a> {
    pub signer_id: &'a str,
    pub public_key: [u8; 32],
    pub nonce: u64,
    pub receiver_id: &'a str,
    pub block_hash: [u8; 32],
    pub deposit: u128,
}

impl TransferTx<'_> {
    /// Borsh encoding of the unsigned transaction.
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut w = Borsh::default();
        w.string(self.signer_id)
            .u8(KEY_TYPE_ED25519)
            .bytes(&self.public_key)
            .u64(self.nonce)
            .string(self.receiver_id)
            .bytes(&self.block_hash)
            .u32(1)
            .u8(ACTION_TRANSFER)
            .u128(self.deposit);
        w.0
    }
}

/// Sign a transaction: returns `(signed borsh bytes, sha256 digest)`.
pub(crate) fn sign_transaction(signer: &NearSigner, tx_bytes: &[u8]) -> (Vec<u8>, [u8; 32]) {
    let digest: [u8; 32] = Sha256::digest(tx_bytes).into();
    let signature = signer.sign(&digest);

    let mut w = Borsh::default();
    w.bytes(tx_bytes).u8(KEY_TYPE_ED25519).bytes(&signature);
    (w.0, digest)
}

#[derive(Debug, Deserialize)]
struct AccountView {
    amount: String,
}

#[derive(Debug, Deserialize)]
struct AccessKeyView {
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct BlockView {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionOutcome {
    status: Value,
    transaction: OutcomeTransaction,
}

#[derive(Debug, Deserialize)]
struct OutcomeTransaction {
    hash: String,
}

/// The single NEAR cluster served by the faucet.
pub struct NearChain {
    params: ChainParams,
    client: JsonRpcClient,
    signer: Arc<NearSigner>,
}

impl NearChain {
    pub fn new(params: ChainParams, signer: Arc<NearSigner>, timeout: Duration) -> Result<Self, ChainError> {
        let client = JsonRpcClient::new(&params.rpc, timeout)?;
        Ok(Self {
            params,
            client,
            signer,
        })
    }

    /// `query` call; view errors come back inside `result.error`.
    async fn query<T: serde::de::DeserializeOwned>(&self, request: Value) -> Result<T, ChainError> {
        let result: Value = self.client.call("query", request).await?;
        if let Some(error) = result.get("error") {
            return Err(ChainError::RpcError(format!("query: {error}")));
        }
        serde_json::from_value(result)
            .map_err(|e| ChainError::RpcError(format!("query: unexpected result shape: {e}")))
    }

    async fn access_key_nonce(&self) -> Result<u64, ChainError> {
        let view: AccessKeyView = self
            .query(json!({
                "request_type": "view_access_key",
                "finality": "final",
                "account_id": self.signer.account_id(),
                "public_key": self.signer.public_key_string(),
            }))
            .await?;
        Ok(view.nonce)
    }

    async fn final_block_hash(&self) -> Result<[u8; 32], ChainError> {
        let block: BlockView = self.client.call("block", json!({ "finality": "final" })).await?;
        bs58::decode(&block.header.hash)
            .into_vec()
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| ChainError::RpcError(format!("invalid block hash `{}`", block.header.hash)))
    }
}

#[async_trait]
impl Chain for NearChain {
    fn id(&self) -> &str {
        &self.params.id
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Near
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
        self.signer.account_id().to_string()
    }

    fn validate_address(&self, address: &str) -> bool {
        is_valid_account_id(address)
    }

    async fn get_balance(&self, address: &str, _token: Option<&str>) -> Result<U256, ChainError> {
        let account: AccountView = self
            .query(json!({
                "request_type": "view_account",
                "finality": "final",
                "account_id": address,
            }))
            .await?;
        U256::from_str_radix(&account.amount, 10)
            .map_err(|e| ChainError::RpcError(format!("invalid account amount `{}`: {e}", account.amount)))
    }

    async fn send(&self, to: &str, amount: U256, _token: Option<&str>) -> Result<String, ChainError> {
        let deposit = u128::try_from(amount)
            .map_err(|_| ChainError::AmountOutOfRange(format!("{amount} yoctoNEAR exceeds u128")))?;

        let nonce = self.access_key_nonce().await? + 1;
        let block_hash = self.final_block_hash().await?;

        let tx = TransferTx {
            signer_id: self.signer.account_id(),
            public_key: self.signer.public_key(),
            nonce,
            receiver_id: to,
            block_hash,
            deposit,
        };
        let (signed, _digest) = sign_transaction(&self.signer, &tx.encode());

        let outcome: ExecutionOutcome = self
            .client
            .call("broadcast_tx_commit", json!([Base64::encode_string(&signed)]))
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        if let Some(failure) = outcome.status.get("Failure") {
            return Err(ChainError::TransactionFailed(failure.to_string()));
        }

        tracing::debug!(
            chain_id = %self.params.id,
            nonce,
            tx_hash = %outcome.transaction.hash,
            "NEAR transaction committed"
        );
        Ok(outcome.transaction.hash)
    }
}
