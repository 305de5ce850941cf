// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial signers, one per network family.
//!
//! Each signer exposes its public address (or account id) and a signing
//! capability. Raw key material stays private to this module and is redacted
//! from `Debug` output.

use std::fmt;
use std::sync::Arc;

use alloy::{
    primitives::Address,
    signers::local::PrivateKeySigner,
};
use ed25519_dalek::{Signer as _, SigningKey};
use k256::SecretKey;

use super::types::ChainKind;

/// Prefix of NEAR ed25519 key strings.
const NEAR_ED25519_PREFIX: &str = "ed25519:";

/// Errors raised while loading signer credentials.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),
}

// =============================================================================
// EVM
// =============================================================================

/// secp256k1 signer whose address is derived from the key at construction.
pub struct EvmSigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl EvmSigner {
    /// Load from a hex key (with or without `0x`) or a PEM-encoded key.
    pub fn from_secret(secret: &str) -> Result<Self, SignerError> {
        let secret = secret.trim();
        let hex_key = if secret.starts_with("-----BEGIN") {
            pem_to_hex(secret.as_bytes())?
        } else {
            secret.trim_start_matches("0x").to_string()
        };

        let key_bytes = alloy::hex::decode(&hex_key)
            .map_err(|e| SignerError::InvalidPrivateKey(e.to_string()))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SignerError::InvalidPrivateKey(e.to_string()))?;
        let address = signer.address();

        Ok(Self { signer, address })
    }

    /// Derived account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Checksummed address string.
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Signing handle used for transaction signatures.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Parse a SEC1 or PKCS#8 PEM key into a hex string.
fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, SignerError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid PEM: {e}")))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid key format: {e}")))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

// =============================================================================
// ed25519 (Solana / NEAR)
// =============================================================================

/// Build an ed25519 key from a 32-byte seed or a 64-byte `seed || public` pair.
fn ed25519_from_bytes(bytes: &[u8]) -> Result<SigningKey, SignerError> {
    match bytes.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        64 => {
            let mut pair = [0u8; 64];
            pair.copy_from_slice(bytes);
            SigningKey::from_keypair_bytes(&pair)
                .map_err(|e| SignerError::InvalidPrivateKey(format!("Keypair mismatch: {e}")))
        }
        n => Err(SignerError::InvalidPrivateKey(format!(
            "ed25519 secret must be 32 or 64 bytes, got {n}"
        ))),
    }
}

fn decode_base58(value: &str) -> Result<Vec<u8>, SignerError> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid base58: {e}")))
}

/// Solana keypair used directly as transaction fee payer.
pub struct SolanaSigner {
    key: SigningKey,
}

impl SolanaSigner {
    /// Load from a base58 secret or a JSON byte array (`solana-keygen` file format).
    pub fn from_secret(secret: &str) -> Result<Self, SignerError> {
        let secret = secret.trim();
        let bytes = if secret.starts_with('[') {
            serde_json::from_str::<Vec<u8>>(secret)
                .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid keypair JSON: {e}")))?
        } else {
            decode_base58(secret)?
        };
        Ok(Self {
            key: ed25519_from_bytes(&bytes)?,
        })
    }

    /// Raw 32-byte public key.
    pub fn pubkey(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Base58 public key, the Solana address.
    pub fn address(&self) -> String {
        bs58::encode(self.pubkey()).into_string()
    }

    /// Sign a serialized message.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl fmt::Debug for SolanaSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// NEAR signer. NEAR accounts are named, so the account id is configured
/// explicitly rather than derived from the key.
pub struct NearSigner {
    account_id: String,
    key: SigningKey,
}

impl NearSigner {
    /// Load from an account id and an `ed25519:<base58>` secret key.
    pub fn new(account_id: &str, secret: &str) -> Result<Self, SignerError> {
        let account_id = account_id.trim();
        if !super::near::is_valid_account_id(account_id) {
            return Err(SignerError::InvalidAccountId(account_id.to_string()));
        }

        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(NEAR_ED25519_PREFIX).unwrap_or(encoded);
        let key = ed25519_from_bytes(&decode_base58(encoded)?)?;

        Ok(Self {
            account_id: account_id.to_string(),
            key,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// `ed25519:<base58>` public key, as the NEAR RPC expects it.
    pub fn public_key_string(&self) -> String {
        format!(
            "{NEAR_ED25519_PREFIX}{}",
            bs58::encode(self.public_key()).into_string()
        )
    }

    /// Sign a 32-byte transaction digest.
    pub fn sign(&self, digest: &[u8]) -> [u8; 64] {
        self.key.sign(digest).to_bytes()
    }
}

impl fmt::Debug for NearSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearSigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key_string())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Signer set
// =============================================================================

/// One signer per network family, shared by every chain of that family.
#[derive(Debug, Clone, Default)]
pub struct SignerSet {
    pub evm: Option<Arc<EvmSigner>>,
    pub solana: Option<Arc<SolanaSigner>>,
    pub near: Option<Arc<NearSigner>>,
}

impl SignerSet {
    /// Public address / account id of the signer for `kind`, if configured.
    pub fn address(&self, kind: ChainKind) -> Option<String> {
        match kind {
            ChainKind::Evm => self.evm.as_ref().map(|s| s.address_string()),
            ChainKind::Solana => self.solana.as_ref().map(|s| s.address()),
            ChainKind::Near => self.near.as_ref().map(|s| s.account_id().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Verifier, VerifyingKey, Signature};

    /// Well-known development key (first Hardhat / Anvil account).
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn evm_signer_derives_address_from_hex() {
        let signer = EvmSigner::from_secret(DEV_KEY).unwrap();
        assert_eq!(signer.address_string(), DEV_ADDRESS);

        let prefixed = EvmSigner::from_secret(&format!("0x{DEV_KEY}")).unwrap();
        assert_eq!(prefixed.address(), signer.address());
    }

    #[test]
    fn evm_signer_accepts_pkcs8_pem() {
        use k256::pkcs8::EncodePrivateKey;

        let key_bytes = alloy::hex::decode(DEV_KEY).unwrap();
        let secret = SecretKey::from_slice(&key_bytes).unwrap();
        let pem = secret.to_pkcs8_pem(k256::pkcs8::LineEnding::LF).unwrap();

        let signer = EvmSigner::from_secret(&pem).unwrap();
        assert_eq!(signer.address_string(), DEV_ADDRESS);
    }

    #[test]
    fn evm_signer_rejects_garbage() {
        assert!(EvmSigner::from_secret("not-a-key").is_err());
        assert!(EvmSigner::from_secret("abcd").is_err());
    }

    #[test]
    fn evm_signer_debug_hides_key() {
        let signer = EvmSigner::from_secret(DEV_KEY).unwrap();
        let debug = format!("{signer:?}");
        assert!(!debug.contains(DEV_KEY));
    }

    fn seed_keypair() -> (SigningKey, [u8; 64]) {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let pair = key.to_keypair_bytes();
        (key, pair)
    }

    #[test]
    fn solana_signer_loads_base58_keypair_and_seed() {
        let (key, pair) = seed_keypair();
        let expected = bs58::encode(key.verifying_key().to_bytes()).into_string();

        let from_pair = SolanaSigner::from_secret(&bs58::encode(pair).into_string()).unwrap();
        assert_eq!(from_pair.address(), expected);

        let from_seed = SolanaSigner::from_secret(&bs58::encode([7u8; 32]).into_string()).unwrap();
        assert_eq!(from_seed.address(), expected);

        let json = serde_json::to_string(&pair.to_vec()).unwrap();
        let from_json = SolanaSigner::from_secret(&json).unwrap();
        assert_eq!(from_json.address(), expected);
    }

    #[test]
    fn solana_signer_rejects_mismatched_keypair() {
        let (_, mut pair) = seed_keypair();
        pair[63] ^= 0xff;
        assert!(SolanaSigner::from_secret(&bs58::encode(pair).into_string()).is_err());
    }

    #[test]
    fn solana_signatures_verify() {
        let (_, pair) = seed_keypair();
        let signer = SolanaSigner::from_secret(&bs58::encode(pair).into_string()).unwrap();
        let sig = signer.sign(b"message");
        let verifying = VerifyingKey::from_bytes(&signer.pubkey()).unwrap();
        assert!(verifying.verify(b"message", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn near_signer_parses_prefixed_secret() {
        let (key, pair) = seed_keypair();
        let secret = format!("ed25519:{}", bs58::encode(pair).into_string());
        let signer = NearSigner::new("faucet.testnet", &secret).unwrap();

        assert_eq!(signer.account_id(), "faucet.testnet");
        assert_eq!(signer.public_key(), key.verifying_key().to_bytes());
        assert!(signer.public_key_string().starts_with("ed25519:"));
    }

    #[test]
    fn near_signer_rejects_bad_account_id() {
        let (_, pair) = seed_keypair();
        let secret = bs58::encode(pair).into_string();
        assert!(matches!(
            NearSigner::new("Faucet!", &secret),
            Err(SignerError::InvalidAccountId(_))
        ));
    }

    #[test]
    fn near_signer_accepts_single_letter_account() {
        let (_, pair) = seed_keypair();
        let secret = bs58::encode(pair).into_string();
        let signer = NearSigner::new("a.testnet", &secret).unwrap();
        assert_eq!(signer.account_id(), "a.testnet");
    }

    #[test]
    fn signer_set_reports_addresses_per_kind() {
        let set = SignerSet {
            evm: Some(Arc::new(EvmSigner::from_secret(DEV_KEY).unwrap())),
            solana: None,
            near: None,
        };
        assert_eq!(set.address(ChainKind::Evm).as_deref(), Some(DEV_ADDRESS));
        assert!(set.address(ChainKind::Solana).is_none());
    }
}
