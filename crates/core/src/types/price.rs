//! Money amounts using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)` and carried as [`Decimal`] end to end.
//! Payment gateways want integer minor units (paise, cents), which is what
//! [`Money::to_minor_units`] produces.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("unsupported currency code: {0}")]
    UnknownCurrency(String),
    #[error("amount {0} does not fit in minor units")]
    Overflow(Decimal),
}

/// ISO 4217 currencies the shop can charge in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_owned())),
        }
    }
}

/// An amount in a currency's major unit (rupees, dollars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Amount in minor units, truncating anything below one paisa/cent.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.trunc().to_i64())
            .ok_or(MoneyError::Overflow(self.amount))
    }

    /// Display form such as `₹1299.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        let money = Money::new(Decimal::new(9000, 2), CurrencyCode::INR);
        assert_eq!(money.to_minor_units().unwrap(), 9000);

        let odd = Money::new(Decimal::new(12_3456, 4), CurrencyCode::INR);
        assert_eq!(odd.to_minor_units().unwrap(), 1234);
    }

    #[test]
    fn test_minor_units_overflow() {
        let huge = Money::new(Decimal::MAX, CurrencyCode::USD);
        assert!(matches!(huge.to_minor_units(), Err(MoneyError::Overflow(_))));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(" USD ".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_display() {
        let money = Money::new(Decimal::new(45, 0), CurrencyCode::INR);
        assert_eq!(money.display(), "₹45.00");
    }
}
