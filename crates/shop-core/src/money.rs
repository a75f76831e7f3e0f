//! # Money Types
//!
//! Monetary amounts for the storefront. All amounts are stored as integers
//! in the smallest currency unit (piastres for EGP, cents for USD).

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    EGP,
    USD,
    SAR,
    AED,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::EGP => "EGP",
            Currency::USD => "USD",
            Currency::SAR => "SAR",
            Currency::AED => "AED",
        }
    }

    /// Parse a currency code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "EGP" => Some(Currency::EGP),
            "USD" => Some(Currency::USD),
            "SAR" => Some(Currency::SAR),
            "AED" => Some(Currency::AED),
            _ => None,
        }
    }

    /// Number of decimal places for this currency
    pub fn decimal_places(&self) -> u8 {
        2
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::EGP
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monetary amount in the smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (piastres for EGP)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from a decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create from the smallest unit (piastres/cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Format for display (e.g., "E£10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::EGP => "E£",
            Currency::USD => "$",
            Currency::SAR => "SR ",
            Currency::AED => "AED ",
        };
        format!("{}{:.2}", symbol, self.as_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let egp = Currency::EGP;
        assert_eq!(egp.to_smallest_unit(10.99), 1099);
        assert_eq!(egp.from_smallest_unit(1099), 10.99);
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("egp"), Some(Currency::EGP));
        assert_eq!(Currency::from_code("EGP"), Some(Currency::EGP));
        assert_eq!(Currency::from_code("xyz"), None);
        assert_eq!(Currency::EGP.as_str(), "EGP");
    }

    #[test]
    fn test_money_display() {
        let price = Money::new(29.99, Currency::EGP);
        assert_eq!(price.amount, 2999);
        assert_eq!(price.display(), "E£29.99");

        let usd = Money::from_cents(1050, Currency::USD);
        assert_eq!(usd.display(), "$10.50");
    }
}
