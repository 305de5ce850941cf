// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user.user_id keys the ledger
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::AuthError;
use crate::state::AppState;

/// The caller, as identified by the doorman.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Opaque user id, used as the ledger key
    pub user_id: String,
}

/// Extractor for authenticated users.
///
/// ## Authentication Modes
///
/// - **Production** (`DOORMAN_URL` set): the doorman resolves the token
/// - **No doorman**: every request is rejected, unless the crate is built
///   with the `dev` feature, in which case the bearer token is the user id
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if an upstream layer already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = match &state.doorman {
            Some(doorman) => doorman.authenticate(auth_header).await.inspect_err(|e| {
                tracing::warn!(error = %e, "Doorman authentication failed");
            })?,
            None => without_doorman(token)?,
        };

        Ok(Auth(user))
    }
}

#[cfg(feature = "dev")]
fn without_doorman(token: &str) -> Result<AuthenticatedUser, AuthError> {
    Ok(AuthenticatedUser {
        user_id: token.to_string(),
    })
}

#[cfg(not(feature = "dev"))]
fn without_doorman(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::NotConfigured)
}
