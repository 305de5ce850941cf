// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minimal JSON-RPC 2.0 transport for the Solana and NEAR clusters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::chain::with_timeout;
use super::types::ChainError;

/// JSON-RPC client bound to one endpoint.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: url::Url,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(format!("{rpc_url}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ChainError::RpcError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Call `method` and deserialize its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let json: Value = with_timeout(self.timeout, async {
            let response = self
                .http
                .post(self.url.clone())
                .json(&payload)
                .send()
                .await
                .map_err(|e| ChainError::RpcError(format!("{method}: {e}")))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ChainError::RpcError(format!("{method}: {e}")))?;

            if !status.is_success() {
                return Err(ChainError::RpcError(format!(
                    "{method} failed with status {status}: {body}"
                )));
            }

            serde_json::from_str(&body)
                .map_err(|e| ChainError::RpcError(format!("{method}: invalid JSON response: {e}")))
        })
        .await?;

        if let Some(error) = json.get("error") {
            return Err(ChainError::RpcError(format!("{method}: {}", describe_error(error))));
        }

        let result = json
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::RpcError(format!("{method}: missing result")))?;

        serde_json::from_value(result)
            .map_err(|e| ChainError::RpcError(format!("{method}: unexpected result shape: {e}")))
    }
}

/// Render a JSON-RPC error object, keeping the structured `data` NEAR attaches.
fn describe_error(error: &Value) -> String {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown RPC error");
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);

    match error.get("data") {
        Some(Value::String(data)) => format!("{code} {message}: {data}"),
        Some(data) if !data.is_null() => format!("{code} {message}: {data}"),
        _ => format!("{code} {message}"),
    }
}
