// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Start-up construction of signers, chains and tokens.
//!
//! Every error returned here is fatal: the process must not serve requests
//! with a partially loaded registry.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::blockchain::{
    ChainError, ChainKind, ChainParams, ChainRegistry, EvmChain, EvmSigner, NearChain, NearSigner,
    SignerSet, SolanaChain, SolanaSigner, Token, TokenRegistry, TokenStandard,
};
use crate::config::{
    ClusterConfig, ConfigError, NetworkLayout, SignerSecrets, EVM_SIGNER_KEY_ENV,
    NEAR_SIGNER_ACCOUNT_ENV, NEAR_SIGNER_KEY_ENV, SOLANA_SIGNER_KEY_ENV,
};

/// Everything the faucet dispenses from.
#[derive(Debug)]
pub struct Networks {
    pub signers: SignerSet,
    pub chains: ChainRegistry,
    pub tokens: TokenRegistry,
}

/// Build one signer per family the layout uses.
///
/// A family with configured chains but no secret is an error; a secret with
/// no chains is ignored.
pub fn load_signers(layout: &NetworkLayout, secrets: &SignerSecrets) -> Result<SignerSet, ConfigError> {
    let mut signers = SignerSet::default();

    if !layout.evm.chains.is_empty() {
        let key = secrets
            .evm_key
            .as_deref()
            .ok_or(ConfigError::MissingSigner("evm", EVM_SIGNER_KEY_ENV))?;
        signers.evm = Some(Arc::new(EvmSigner::from_secret(key)?));
    }

    if layout.solana.is_some() {
        let key = secrets
            .solana_key
            .as_deref()
            .ok_or(ConfigError::MissingSigner("solana", SOLANA_SIGNER_KEY_ENV))?;
        signers.solana = Some(Arc::new(SolanaSigner::from_secret(key)?));
    }

    if layout.near.is_some() {
        let account = secrets
            .near_account
            .as_deref()
            .ok_or(ConfigError::MissingSigner("near", NEAR_SIGNER_ACCOUNT_ENV))?;
        let key = secrets
            .near_key
            .as_deref()
            .ok_or(ConfigError::MissingSigner("near", NEAR_SIGNER_KEY_ENV))?;
        signers.near = Some(Arc::new(NearSigner::new(account, key)?));
    }

    Ok(signers)
}

fn cluster_params(kind: ChainKind, cluster: &ClusterConfig) -> ChainParams {
    let family = match kind {
        ChainKind::Solana => "Solana",
        ChainKind::Near => "Near",
        ChainKind::Evm => "Evm",
    };
    ChainParams {
        id: cluster.id.clone(),
        name: cluster
            .name
            .clone()
            .unwrap_or_else(|| format!("{family} {}", cluster.id)),
        rpc: cluster.rpc.clone(),
        native_token: cluster.native_token.clone(),
        decimals: cluster.decimals,
    }
}

/// Chains built from the layout, before any network access.
pub struct BuiltChains {
    pub evm: Vec<Arc<EvmChain>>,
    pub solana: Option<Arc<SolanaChain>>,
    pub near: Option<Arc<NearChain>>,
}

pub fn build_chains(
    layout: &NetworkLayout,
    signers: &SignerSet,
    timeout: Duration,
) -> Result<BuiltChains, ConfigError> {
    let mut evm = Vec::with_capacity(layout.evm.chains.len());
    if let Some(signer) = &signers.evm {
        for chain in &layout.evm.chains {
            let params = ChainParams {
                id: chain.chain_id.clone(),
                name: chain.name.clone(),
                rpc: chain.rpc.clone(),
                native_token: chain.native_token.clone(),
                decimals: chain.decimals,
            };
            evm.push(Arc::new(EvmChain::new(
                params,
                signer.clone(),
                timeout,
                layout.evm.serialize_submissions,
            )?));
        }
    }

    let solana = match (&layout.solana, &signers.solana) {
        (Some(cluster), Some(signer)) => Some(Arc::new(SolanaChain::new(
            cluster_params(ChainKind::Solana, cluster),
            signer.clone(),
            timeout,
        )?)),
        _ => None,
    };

    let near = match (&layout.near, &signers.near) {
        (Some(cluster), Some(signer)) => Some(Arc::new(NearChain::new(
            cluster_params(ChainKind::Near, cluster),
            signer.clone(),
            timeout,
        )?)),
        _ => None,
    };

    Ok(BuiltChains { evm, solana, near })
}

/// Register every token of the layout. Validity was checked when parsing.
pub fn build_tokens(layout: &NetworkLayout) -> Result<TokenRegistry, ConfigError> {
    let mut tokens = TokenRegistry::new();
    for token in &layout.evm.tokens {
        let standard = token
            .standard
            .parse::<TokenStandard>()
            .map_err(|reason| ConfigError::InvalidToken {
                address: token.address.clone(),
                reason,
            })?;
        tokens.insert(Token {
            address: token.address.to_lowercase(),
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            standard,
            decimals: token.decimals,
            chains: token.chains.iter().cloned().collect::<BTreeSet<_>>(),
        })?;
    }
    Ok(tokens)
}

/// Check every EVM node serves the configured chain id.
///
/// A mismatch is fatal. An unreachable node is logged and tolerated so the
/// faucet can start while one RPC provider is down.
pub async fn verify_chains(built: &BuiltChains) -> Result<(), ConfigError> {
    for chain in &built.evm {
        match chain.verify_chain_id().await {
            Ok(()) => {}
            Err(e @ ChainError::InvalidChainId(_)) => return Err(e.into()),
            Err(e) => warn!(
                chain_id = chain.chain_id(),
                error = %e,
                "EVM node unreachable, chain id not verified"
            ),
        }
    }

    if let Some(solana) = &built.solana {
        match solana.version().await {
            Ok(version) => info!(version = %version, "Solana node reachable"),
            Err(e) => warn!(error = %e, "Solana node unreachable"),
        }
    }

    Ok(())
}

/// Load signers, chains and tokens, verifying remote chain ids.
pub async fn load(
    layout: &NetworkLayout,
    secrets: &SignerSecrets,
    timeout: Duration,
) -> Result<Networks, ConfigError> {
    let signers = load_signers(layout, secrets)?;
    let built = build_chains(layout, &signers, timeout)?;
    verify_chains(&built).await?;

    let mut chains = ChainRegistry::new();
    for chain in built.evm {
        chains.insert(chain)?;
    }
    if let Some(solana) = built.solana {
        chains.insert(solana)?;
    }
    if let Some(near) = built.near {
        chains.insert(near)?;
    }

    let tokens = build_tokens(layout)?;

    info!(
        chains = chains.len(),
        tokens = tokens.len(),
        evm_signer = ?signers.address(ChainKind::Evm),
        solana_signer = ?signers.address(ChainKind::Solana),
        near_signer = ?signers.address(ChainKind::Near),
        "Faucet networks loaded"
    );

    Ok(Networks {
        signers,
        chains,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn near_key() -> String {
        let seed = [7u8; 32];
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        format!("ed25519:{}", bs58::encode(signing.to_keypair_bytes()).into_string())
    }

    fn solana_key() -> String {
        bs58::encode([9u8; 32]).into_string()
    }

    fn layout() -> NetworkLayout {
        NetworkLayout::parse(
            r#"{
                "evm": {
                    "chains": [
                        { "chain_id": "43113", "name": "Fuji", "rpc": "http://127.0.0.1:1", "native_token": "AVAX", "decimals": 18 },
                        { "chain_id": "31337", "name": "Local", "rpc": "http://127.0.0.1:2", "native_token": "ETH", "decimals": 18 }
                    ],
                    "tokens": [
                        { "name": "USD Coin", "symbol": "USDC", "address": "0x5425890298AED601595A70AB815C96711A31BC65", "type": "ERC20", "decimals": 6, "chains": ["43113"] }
                    ]
                },
                "solana": { "id": "devnet", "rpc": "http://127.0.0.1:3", "native_token": "SOL", "decimals": 9 },
                "near": { "id": "testnet", "rpc": "http://127.0.0.1:4", "native_token": "NEAR", "decimals": 24 }
            }"#,
        )
        .unwrap()
    }

    fn secrets() -> SignerSecrets {
        SignerSecrets {
            evm_key: Some(EVM_KEY.to_string()),
            solana_key: Some(solana_key()),
            near_account: Some("faucet.testnet".to_string()),
            near_key: Some(near_key()),
        }
    }

    #[test]
    fn missing_secret_for_configured_family_is_fatal() {
        let layout = layout();

        let mut no_evm = secrets();
        no_evm.evm_key = None;
        assert!(matches!(
            load_signers(&layout, &no_evm),
            Err(ConfigError::MissingSigner("evm", _))
        ));

        let mut no_near_key = secrets();
        no_near_key.near_key = None;
        assert!(matches!(
            load_signers(&layout, &no_near_key),
            Err(ConfigError::MissingSigner("near", NEAR_SIGNER_KEY_ENV))
        ));
    }

    #[test]
    fn unused_secrets_are_ignored() {
        let signers = load_signers(&NetworkLayout::default(), &secrets()).unwrap();
        assert!(signers.evm.is_none());
        assert!(signers.solana.is_none());
        assert!(signers.near.is_none());
    }

    #[test]
    fn malformed_secret_is_fatal() {
        let mut bad = secrets();
        bad.evm_key = Some("not-a-key".to_string());
        assert!(matches!(
            load_signers(&layout(), &bad),
            Err(ConfigError::Signer(_))
        ));
    }

    #[test]
    fn builds_chains_with_default_cluster_names() {
        let layout = layout();
        let signers = load_signers(&layout, &secrets()).unwrap();
        let built = build_chains(&layout, &signers, Duration::from_secs(1)).unwrap();

        assert_eq!(built.evm.len(), 2);
        let solana = built.solana.unwrap();
        assert_eq!(crate::blockchain::Chain::name(solana.as_ref()), "Solana devnet");
        let near = built.near.unwrap();
        assert_eq!(crate::blockchain::Chain::name(near.as_ref()), "Near testnet");
    }

    #[test]
    fn non_numeric_evm_chain_id_is_fatal() {
        let layout = NetworkLayout::parse(
            r#"{ "evm": { "chains": [
                { "chain_id": "fuji", "name": "Fuji", "rpc": "http://127.0.0.1:1", "native_token": "AVAX", "decimals": 18 }
            ] } }"#,
        )
        .unwrap();
        let signers = load_signers(&layout, &secrets()).unwrap();
        assert!(matches!(
            build_chains(&layout, &signers, Duration::from_secs(1)),
            Err(ConfigError::Chain(ChainError::InvalidChainId(_)))
        ));
    }

    #[test]
    fn tokens_are_keyed_by_lowercase_address() {
        let tokens = build_tokens(&layout()).unwrap();
        let token = tokens
            .get("0x5425890298aed601595a70ab815c96711a31bc65")
            .unwrap();
        assert_eq!(token.symbol, "USDC");
        assert!(token.supports("43113"));
        assert!(!token.supports("31337"));
    }

    #[tokio::test]
    async fn unreachable_nodes_do_not_abort_loading() {
        let networks = load(&layout(), &secrets(), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(networks.chains.len(), 4);
        assert!(networks.chains.get(ChainKind::Evm, "43113").is_some());
        assert!(networks.chains.get(ChainKind::Solana, "devnet").is_some());
        assert!(networks.chains.get(ChainKind::Near, "testnet").is_some());
        assert_eq!(networks.tokens.len(), 1);
        assert_eq!(
            networks.signers.address(ChainKind::Near).as_deref(),
            Some("faucet.testnet")
        );
    }
}
