// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    blockchain::{ChainKind, TokenStandard},
    models::{
        BalanceListResponse, ChainInfo, ChainListResponse, SendRequest, SendResponse, TokenInfo,
        TokenListResponse,
    },
    state::AppState,
    storage::BalanceRecord,
};

pub mod faucet;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/faucet/send/evm", post(faucet::send_evm))
        .route("/faucet/send/solana", post(faucet::send_solana))
        .route("/faucet/send/near", post(faucet::send_near))
        .route("/faucet/chains", get(faucet::list_chains))
        .route("/faucet/tokens", get(faucet::list_tokens))
        .route("/faucet/balances", get(faucet::list_balances))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        faucet::send_evm,
        faucet::send_solana,
        faucet::send_near,
        faucet::list_chains,
        faucet::list_tokens,
        faucet::list_balances,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            SendRequest,
            SendResponse,
            ChainInfo,
            ChainListResponse,
            TokenInfo,
            TokenListResponse,
            BalanceRecord,
            BalanceListResponse,
            ChainKind,
            TokenStandard,
            AuthenticatedUser,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Faucet", description = "Transfers and faucet inventory"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_lists_faucet_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/faucet/send/evm",
            "/v1/faucet/send/solana",
            "/v1/faucet/send/near",
            "/v1/faucet/chains",
            "/v1/faucet/tokens",
            "/v1/faucet/balances",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn send_without_credentials_is_401() {
        let response = router(AppState::for_tests())
            .oneshot(
                Request::post("/v1/faucet/send/evm")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"chain_id":"1","to":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8","amount":"1","symbol":"ETH"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chain_list_is_public() {
        let response = router(AppState::for_tests())
            .oneshot(Request::get("/v1/faucet/chains").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
