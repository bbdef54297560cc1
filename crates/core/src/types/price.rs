//! Type-safe price representation using decimal arithmetic.
//!
//! All prices in the catalogue are euros. The backend exchanges them as JSON
//! numbers, so [`Price`] serializes as a float and accepts either a number or a
//! numeric string on input.

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative amount in euros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of euros.
    #[must_use]
    pub fn from_euros(euros: u32) -> Self {
        Self(Decimal::from(euros))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Parse a price typed in a form. Accepts a comma as decimal separator.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a number or is negative.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let normalized = input.trim().replace(',', ".");
        let amount = normalized
            .parse::<Decimal>()
            .map_err(|_| PriceError::Invalid(input.to_string()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The price of `quantity` units, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} €", self.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.0)))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 0)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_euros(80).to_string(), "80.00 €");
        assert_eq!(Price::from_cents(129_990).to_string(), "1299.90 €");
    }

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Price::parse("12,5").unwrap(), Price::from_cents(1250));
        assert_eq!(Price::parse(" 99.99 ").unwrap(), Price::from_cents(9999));
        assert!(Price::parse("abc").is_err());
        assert!(Price::parse("-3").is_err());
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from_euros(80).times(2), Price::from_cents(1050)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(17050));
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let huge = Price::new(Decimal::from_i128_with_scale(50_000_000_000_000_000_000, 0)).unwrap();
        assert_eq!(huge.times(4_000_000_000).amount(), Decimal::MAX);

        let total: Price = [huge.times(4_000_000_000), huge].into_iter().sum();
        assert_eq!(total.amount(), Decimal::MAX);
    }

    #[test]
    fn test_wire_format_is_number() {
        let json = serde_json::to_value(Price::from_euros(80)).unwrap();
        assert!(json.is_number());

        let parsed: Price = serde_json::from_str("99.5").unwrap();
        assert_eq!(parsed, Price::from_cents(9950));

        assert!(serde_json::from_str::<Price>("-1").is_err());
    }
}
