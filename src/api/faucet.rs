// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    blockchain::ChainKind,
    error::ApiError,
    faucet::TransferRequest,
    models::{BalanceListResponse, ChainListResponse, SendRequest, SendResponse, TokenListResponse},
    state::AppState,
};

async fn send(
    kind: ChainKind,
    user_id: &str,
    state: &AppState,
    request: SendRequest,
) -> Result<Json<SendResponse>, ApiError> {
    let transfer = TransferRequest {
        kind,
        chain_id: request.chain_id,
        to: request.to,
        amount: request.amount,
        symbol: request.symbol,
        token_address: request.token_address,
    };
    let tx_hash = state.faucet.dispatch(user_id, &transfer).await?;
    Ok(Json(SendResponse { tx_hash }))
}

/// Send native coin or an ERC-20 token on an EVM chain.
#[utoipa::path(
    post,
    path = "/v1/faucet/send/evm",
    request_body = SendRequest,
    tag = "Faucet",
    responses(
        (status = 200, body = SendResponse),
        (status = 400, description = "Invalid amount, receiver or symbol"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Unknown chain or token"),
        (status = 500, description = "Chain unavailable, faucet drained or ledger failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_evm(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    send(ChainKind::Evm, &user.user_id, &state, request).await
}

/// Send SOL on the Solana cluster.
#[utoipa::path(
    post,
    path = "/v1/faucet/send/solana",
    request_body = SendRequest,
    tag = "Faucet",
    responses(
        (status = 200, body = SendResponse),
        (status = 400, description = "Invalid amount, receiver or symbol"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Unknown cluster or asset"),
        (status = 500, description = "Chain unavailable, faucet drained or ledger failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_solana(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    send(ChainKind::Solana, &user.user_id, &state, request).await
}

/// Send NEAR on the NEAR cluster.
#[utoipa::path(
    post,
    path = "/v1/faucet/send/near",
    request_body = SendRequest,
    tag = "Faucet",
    responses(
        (status = 200, body = SendResponse),
        (status = 400, description = "Invalid amount, receiver or symbol"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Unknown cluster or asset"),
        (status = 500, description = "Chain unavailable, faucet drained or ledger failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_near(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    send(ChainKind::Near, &user.user_id, &state, request).await
}

#[utoipa::path(
    get,
    path = "/v1/faucet/chains",
    tag = "Faucet",
    responses(
        (status = 200, body = ChainListResponse),
        (status = 500, description = "A chain is unavailable")
    )
)]
pub async fn list_chains(State(state): State<AppState>) -> Result<Json<ChainListResponse>, ApiError> {
    let chains = state.faucet.chain_list().await?;
    Ok(Json(ChainListResponse { chains }))
}

#[utoipa::path(
    get,
    path = "/v1/faucet/tokens",
    tag = "Faucet",
    responses(
        (status = 200, body = TokenListResponse),
        (status = 500, description = "A chain is unavailable")
    )
)]
pub async fn list_tokens(State(state): State<AppState>) -> Result<Json<TokenListResponse>, ApiError> {
    let tokens = state.faucet.token_list().await?;
    Ok(Json(TokenListResponse { tokens }))
}

/// Cumulative amounts the caller has received.
#[utoipa::path(
    get,
    path = "/v1/faucet/balances",
    tag = "Faucet",
    responses(
        (status = 200, body = BalanceListResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_balances(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BalanceListResponse>, ApiError> {
    let balances = state.faucet.balances(&user.user_id).await?;
    Ok(Json(BalanceListResponse { balances }))
}
