// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between on-chain minor units and human-readable amounts.
//!
//! On-chain amounts stay integer (`U256`) from request parsing to submission.
//! The float produced by [`to_human`] is for display and for the payout ledger
//! only; it never feeds back into a transaction.

use alloy::primitives::U256;

/// Errors raised while reading a requested amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,

    #[error("amount must be a non-negative integer in minor units, got `{0}`")]
    NotInteger(String),

    #[error("amount does not fit in 256 bits")]
    Overflow,

    #[error("amount must be greater than 0")]
    NotPositive,
}

/// Parse a decimal digit string into minor units.
///
/// Signs, fractions, exponents and whitespace inside the number are rejected.
pub fn parse_minor_units(raw: &str) -> Result<U256, AmountError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotInteger(value.to_string()));
    }
    U256::from_str_radix(value, 10).map_err(|_| AmountError::Overflow)
}

/// Parse a transfer amount and require it to be strictly positive.
pub fn parse_transfer_amount(raw: &str) -> Result<U256, AmountError> {
    let amount = parse_minor_units(raw)?;
    if is_less_or_eq(&amount, &U256::ZERO) {
        return Err(AmountError::NotPositive);
    }
    Ok(amount)
}

/// `a <= b` over minor units; used for balance sufficiency checks.
pub fn is_less_or_eq(a: &U256, b: &U256) -> bool {
    a <= b
}

/// Format minor units as an exact decimal string with the given exponent.
///
/// Works on the digit string, so any `decimals` value is accepted.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let trimmed = fraction.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Convert minor units to a human value: `amount / 10^decimals`.
///
/// Lossy above 2^53 significant units; display and ledger use only.
pub fn to_human(amount: U256, decimals: u8) -> f64 {
    format_amount(amount, decimals).parse::<f64>().unwrap_or(f64::INFINITY)
}
