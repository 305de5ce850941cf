// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Callers are authenticated by an external "doorman" service. The faucet
//! never inspects the bearer token itself.
//!
//! ## Auth Flow
//!
//! 1. The client sends `Authorization: Bearer <token>`
//! 2. The faucet forwards the header to `GET {DOORMAN_URL}/doorman/authenticate`
//! 3. A 2xx answer carries `{"id": "<user id>"}`; that id keys the ledger
//! 4. Any other answer, or an unreachable doorman, is a 401
//!
//! Only the send and balance endpoints require authentication. Health, chain
//! and token listings are public.

pub mod doorman;
pub mod error;
pub mod extractor;

pub use doorman::DoormanClient;
pub use error::AuthError;
pub use extractor::{Auth, AuthenticatedUser};
