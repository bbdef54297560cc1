//! Cart read model returned by the backend's `/cart` endpoints.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::lenient;
use super::price::Price;
use super::product::Product;

/// A product in the cart with its quantity and the unit price captured when
/// it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCartLine")]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub price: Price,
}

impl CartLine {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Snapshotted unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

#[derive(Deserialize)]
struct RawCartLine {
    product: Product,
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    price: Option<Price>,
}

impl From<RawCartLine> for CartLine {
    fn from(raw: RawCartLine) -> Self {
        // Lines created before prices were captured carry no price.
        let price = raw.price.unwrap_or(raw.product.prices.public);
        Self {
            product: raw.product,
            quantity: raw.quantity.max(1),
            price,
        }
    }
}

/// The full list of cart lines, as returned after every cart mutation.
///
/// Lines whose product no longer exists are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "items", default, deserialize_with = "lenient::skip_invalid")]
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Number of units in the cart, shown on the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .map(|l| l.quantity)
            .fold(0, u32::saturating_add)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, product: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let cart: Cart = serde_json::from_str(
            r#"{"items": [
                {"product": {"_id": "p1", "name": "Écran 24P", "price": 200}, "quantity": 2, "price": 150},
                {"product": {"_id": "p2", "name": "Souris", "price": 12.5}, "quantity": 3},
                {"product": null, "quantity": 1, "price": 10}
            ]}"#,
        )
        .unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Price::from_cents(33_750));
        assert_eq!(
            cart.line(&ProductId::new("p2")).unwrap().price,
            Price::from_cents(1250)
        );
    }

    #[test]
    fn test_oversized_quantities_do_not_overflow() {
        let cart: Cart = serde_json::from_str(
            r#"{"items": [
                {"product": {"_id": "p1", "name": "Câble"}, "quantity": 4000000000, "price": 50000000000000000000},
                {"product": {"_id": "p2", "name": "Câble"}, "quantity": 4000000000, "price": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(cart.item_count(), u32::MAX);
        assert_eq!(cart.total().amount(), rust_decimal::Decimal::MAX);
    }

    #[test]
    fn test_empty_cart_payload() {
        let cart: Cart = serde_json::from_str("{}").unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }
}
