// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana cluster client.
//!
//! Transfers are legacy transactions carrying one System Program `Transfer`
//! instruction, serialized by hand:
//!
//! ```text
//! transaction = shortvec(1) || signature[64] || message
//! message     = header[3] || shortvec(3) || keys[3][32] || blockhash[32]
//!               || shortvec(1) || instruction
//! instruction = program_idx || shortvec(2) || [0, 1] || shortvec(12)
//!               || u32le(2) || u64le(lamports)
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::Deserialize;
use serde_json::json;

use super::chain::Chain;
use super::rpc::JsonRpcClient;
use super::signing::SolanaSigner;
use super::types::{ChainError, ChainKind, ChainParams};

/// System Program id: 32 zero bytes (`11111111111111111111111111111111`).
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// Index of `Transfer` in the System Program instruction enum.
const SYSTEM_TRANSFER_INDEX: u32 = 2;

/// Base58 of a 32-byte public key is at most 44 characters.
const MAX_ADDRESS_LEN: usize = 44;

/// Base58 string decoding to exactly 32 bytes, not the system account.
pub fn is_valid_address(address: &str) -> bool {
    if address.len() < 32 || address.len() > MAX_ADDRESS_LEN {
        return false;
    }
    match decode_pubkey(address) {
        Some(key) => key != SYSTEM_PROGRAM_ID,
        None => false,
    }
}

fn decode_pubkey(address: &str) -> Option<[u8; 32]> {
    let bytes = bs58::decode(address).into_vec().ok()?;
    bytes.try_into().ok()
}

/// Compact-u16 length prefix used throughout the Solana wire format.
fn encode_shortvec(out: &mut Vec<u8>, mut len: u16) {
    loop {
        let mut byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Serialize the message of a single system transfer from `from` to `to`.
pub(crate) fn transfer_message(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(3 + 1 + 3 * 32 + 32 + 1 + 1 + 1 + 2 + 1 + 12);

    // header: 1 required signature, 0 read-only signed, 1 read-only unsigned
    message.extend_from_slice(&[1, 0, 1]);

    encode_shortvec(&mut message, 3);
    message.extend_from_slice(from);
    message.extend_from_slice(to);
    message.extend_from_slice(&SYSTEM_PROGRAM_ID);

    message.extend_from_slice(recent_blockhash);

    encode_shortvec(&mut message, 1);
    message.push(2); // program id index
    encode_shortvec(&mut message, 2);
    message.extend_from_slice(&[0, 1]);

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    encode_shortvec(&mut message, data.len() as u16);
    message.extend_from_slice(&data);

    message
}

/// Wrap a message with its single fee-payer signature.
pub(crate) fn signed_transaction(signature: &[u8; 64], message: &[u8]) -> Vec<u8> {
    let mut tx = Vec::with_capacity(1 + 64 + message.len());
    encode_shortvec(&mut tx, 1);
    tx.extend_from_slice(signature);
    tx.extend_from_slice(message);
    tx
}

#[derive(Debug, Deserialize)]
struct ValueResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

/// The single Solana cluster served by the faucet.
pub struct SolanaChain {
    params: ChainParams,
    client: JsonRpcClient,
    signer: Arc<SolanaSigner>,
}

impl SolanaChain {
    pub fn new(params: ChainParams, signer: Arc<SolanaSigner>, timeout: Duration) -> Result<Self, ChainError> {
        let client = JsonRpcClient::new(&params.rpc, timeout)?;
        Ok(Self {
            params,
            client,
            signer,
        })
    }

    /// Node software version, used as a reachability probe at start-up.
    pub async fn version(&self) -> Result<String, ChainError> {
        let version: serde_json::Value = self.client.call("getVersion", json!([])).await?;
        Ok(version
            .get("solana-core")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], ChainError> {
        let response: ValueResponse<LatestBlockhash> = self
            .client
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        decode_pubkey(&response.value.blockhash).ok_or_else(|| {
            ChainError::RpcError(format!("invalid blockhash `{}`", response.value.blockhash))
        })
    }
}

#[async_trait]
impl Chain for SolanaChain {
    fn id(&self) -> &str {
        &self.params.id
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Solana
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
        self.signer.address()
    }

    fn validate_address(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    async fn get_balance(&self, address: &str, _token: Option<&str>) -> Result<U256, ChainError> {
        let response: ValueResponse<u64> = self
            .client
            .call("getBalance", json!([address, { "commitment": "finalized" }]))
            .await?;
        Ok(U256::from(response.value))
    }

    async fn send(&self, to: &str, amount: U256, _token: Option<&str>) -> Result<String, ChainError> {
        let receiver = decode_pubkey(to).ok_or_else(|| ChainError::InvalidAddress(to.to_string()))?;
        let lamports = u64::try_from(amount)
            .map_err(|_| ChainError::AmountOutOfRange(format!("{amount} lamports exceeds u64")))?;

        let blockhash = self.latest_blockhash().await?;
        let message = transfer_message(&self.signer.pubkey(), &receiver, lamports, &blockhash);
        let signature = self.signer.sign(&message);
        let tx = signed_transaction(&signature, &message);

        let tx_hash: String = self
            .client
            .call(
                "sendTransaction",
                json!([Base64::encode_string(&tx), { "encoding": "base64" }]),
            )
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            chain_id = %self.params.id,
            lamports,
            tx_hash = %tx_hash,
            "Solana transaction submitted"
        );
        Ok(tx_hash)
    }
}
