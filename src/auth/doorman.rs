// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the delegated authentication service.

use std::time::Duration;

use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{AuthError, AuthenticatedUser};
use crate::config::{ConfigError, DOORMAN_URL_ENV};

const AUTHENTICATE_PATH: &str = "/doorman/authenticate";

/// Default request timeout.
pub const DEFAULT_DOORMAN_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct DoormanUser {
    id: String,
}

/// Resolves a bearer token to a user id through the doorman.
#[derive(Debug, Clone)]
pub struct DoormanClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl DoormanClient {
    /// Build a client for the doorman at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Env {
            name: DOORMAN_URL_ENV,
            reason,
        };

        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(AUTHENTICATE_PATH))
            .map_err(|e| invalid(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Forward the caller's `Authorization` header and return who they are.
    pub async fn authenticate(&self, authorization: &str) -> Result<AuthenticatedUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| AuthError::DoormanUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::Rejected)
            }
            status if !status.is_success() => {
                return Err(AuthError::DoormanUnavailable(format!(
                    "doorman answered {status}"
                )))
            }
            _ => {}
        }

        let user: DoormanUser = response
            .json()
            .await
            .map_err(|e| AuthError::DoormanUnavailable(format!("invalid user response: {e}")))?;
        if user.id.trim().is_empty() {
            return Err(AuthError::Rejected);
        }

        Ok(AuthenticatedUser { user_id: user.id })
    }
}
