//! # Money
//!
//! Currency codes and major/minor unit conversion.
//! Event prices are stored in major units; the gateway only ever sees minor units.

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the ISO 4217 currency code as the gateway expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    /// Number of minor units per major unit (paise per rupee, cents per dollar)
    pub fn minor_units_per_major(&self) -> Decimal {
        Decimal::ONE_HUNDRED
    }

    /// Convert a major-unit price to minor units, rounding half away from zero.
    ///
    /// Fails with `InvalidState` when the result is not a positive integer that
    /// fits the gateway's amount field.
    pub fn to_minor_units(&self, price: Decimal) -> PaymentResult<i64> {
        let scaled = price
            .checked_mul(self.minor_units_per_major())
            .ok_or_else(|| PaymentError::InvalidState(format!("price {} overflows", price)))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        match scaled.to_i64() {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(PaymentError::InvalidState(format!(
                "event price {} does not yield a positive {} amount",
                price,
                self.as_str()
            ))),
        }
    }

    /// Convert minor units back to a major-unit decimal
    pub fn from_minor_units(&self, amount: i64) -> Decimal {
        Decimal::new(amount, 2)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(PaymentError::InvalidState(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}
