//! Value objects shared by purchases and payments.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A currency, identified by its ISO code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code (e.g. "BRL").
    pub code: String,

    /// Display symbol (e.g. "R$").
    pub symbol: String,

    /// Human-readable name.
    pub name: String,
}

impl Currency {
    /// Creates a new currency.
    pub fn new(
        code: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Brazilian real, the restaurant's operating currency.
    pub fn brl() -> Self {
        Self::new("BRL", "R$", "Real")
    }
}

/// Money amount in minor units (cents) of a given currency.
///
/// Amounts in different currencies never mix; no conversion is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00)
    cents: i64,

    currency: Currency,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self { cents: 0, currency }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the currency.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Returns the whole units portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Adds another amount of the same currency.
    pub fn checked_add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency.code != other.currency.code {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency.code.clone(),
                found: other.currency.code.clone(),
            });
        }
        let cents = self
            .cents
            .checked_add(other.cents)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(Money {
            cents,
            currency: self.currency.clone(),
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{} {}.{:02}",
            self.currency.symbol,
            self.units().abs(),
            self.cents_part()
        )
    }
}
