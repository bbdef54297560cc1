//! Catalogue products.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::category::Category;
use super::id::ProductId;
use super::lenient;
use super::price::Price;
use super::tier::Tier;

/// The four price fields carried by every product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPrices {
    /// Public price, shown to visitors and staff carts.
    #[serde(rename = "price", default, deserialize_with = "price_or_zero")]
    pub public: Price,
    #[serde(rename = "pricet1", default, deserialize_with = "price_or_zero")]
    pub tier1: Price,
    #[serde(rename = "pricet2", default, deserialize_with = "price_or_zero")]
    pub tier2: Price,
    #[serde(rename = "pricet3", default, deserialize_with = "price_or_zero")]
    pub tier3: Price,
}

impl ProductPrices {
    /// Price field selected by a company tier.
    #[must_use]
    pub const fn for_tier(&self, tier: Tier) -> Price {
        match tier {
            Tier::Tier1 => self.tier1,
            Tier::Tier2 => self.tier2,
            Tier::Tier3 => self.tier3,
        }
    }
}

fn price_or_zero<'de, D>(deserializer: D) -> Result<Price, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Price>::deserialize(deserializer)?.unwrap_or_default())
}

/// Open-ended technical specifications.
///
/// Values are kept as display text; blank values are dropped on decode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Specs(BTreeMap<String, String>);

impl Specs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a value; blank values remove the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value.trim().to_owned());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries ordered as the category's form lists them, followed by any
    /// other keys alphabetically.
    #[must_use]
    pub fn ordered_for(&self, category: Option<Category>) -> Vec<(&str, &str)> {
        let fields = category.map_or(&[][..], Category::spec_fields);
        let mut ordered: Vec<(&str, &str)> = fields
            .iter()
            .filter_map(|f| self.0.get_key_value(f.key))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        ordered.extend(
            self.iter()
                .filter(|(k, _)| !fields.iter().any(|f| f.key == *k)),
        );
        ordered
    }
}

impl<'de> Deserialize<'de> for Specs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut specs = Self::new();
        for (key, value) in raw {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(true) => "Oui".to_owned(),
                Value::Bool(false) => "Non".to_owned(),
                _ => continue,
            };
            specs.set(key, text);
        }
        Ok(specs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Specs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut specs = Self::new();
        for (k, v) in iter {
            specs.set(k, v);
        }
        specs
    }
}

/// A catalogue product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub sku: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub brand: String,
    /// Free-text product type, e.g. `PC PORTABLE`.
    #[serde(rename = "type", default, deserialize_with = "lenient::string_or_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub model: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description2: Option<String>,
    #[serde(flatten)]
    pub prices: ProductPrices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<String>,
    /// Part of the national range (`gn`).
    #[serde(rename = "gn", default, deserialize_with = "lenient::flag")]
    pub national_range: bool,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub image: String,
    #[serde(rename = "role", default, deserialize_with = "Category::deserialize_lenient")]
    pub category: Option<Category>,
    #[serde(default)]
    pub specs: Specs,
}

impl Product {
    /// Name shown in lists and tickets.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Produit sans nom"
        } else {
            &self.name
        }
    }
}

/// Body of a product create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub description: String,
    pub description2: String,
    #[serde(flatten)]
    pub prices: ProductPrices,
    pub guarantee: String,
    #[serde(rename = "gn")]
    pub national_range: bool,
    pub image: String,
    #[serde(rename = "role")]
    pub category: Category,
    pub specs: Specs,
}

impl ProductInput {
    /// Keep only the specification keys the category's form offers.
    #[must_use]
    pub fn with_category_specs(mut self) -> Self {
        let fields = self.category.spec_fields();
        self.specs = self
            .specs
            .iter()
            .filter(|(k, _)| fields.iter().any(|f| f.key == *k))
            .collect();
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LAPTOP: &str = r#"{
        "_id": "p1",
        "name": "Latitude 5440",
        "sku": 5440,
        "brand": "DELL",
        "type": "PC PORTABLE",
        "model": "5440",
        "description": "Portable 14 pouces",
        "price": 100,
        "pricet1": 80,
        "pricet2": "70.5",
        "pricet3": 60,
        "gn": true,
        "image": "/uploads/latitude.jpg",
        "role": "ordinateurs",
        "specs": {"ram": "16 Go", "cpu": "Intel Core i5", "extra": 3, "empty": "", "nested": {}}
    }"#;

    #[test]
    fn test_decodes_backend_product() {
        let product: Product = serde_json::from_str(LAPTOP).unwrap();
        assert_eq!(product.sku, "5440");
        assert_eq!(product.kind, "PC PORTABLE");
        assert_eq!(product.category, Some(Category::Computers));
        assert_eq!(product.prices.public, Price::from_euros(100));
        assert_eq!(product.prices.tier2, Price::from_cents(7050));
        assert!(product.national_range);
        assert_eq!(product.specs.get("extra"), Some("3"));
        assert_eq!(product.specs.get("empty"), None);
        assert_eq!(product.specs.get("nested"), None);
    }

    #[test]
    fn test_missing_prices_default_to_zero() {
        let product: Product = serde_json::from_str(r#"{"_id": "p2", "role": "inconnu"}"#).unwrap();
        assert_eq!(product.prices, ProductPrices::default());
        assert_eq!(product.category, None);
        assert_eq!(product.display_name(), "Produit sans nom");
    }

    #[test]
    fn test_negative_price_rejected() {
        let json = LAPTOP.replace(r#""pricet3": 60"#, r#""pricet3": -60"#);
        assert!(serde_json::from_str::<Product>(&json).is_err());
    }

    #[test]
    fn test_specs_ordered_by_category_form() {
        let product: Product = serde_json::from_str(LAPTOP).unwrap();
        let keys: Vec<_> = product
            .specs
            .ordered_for(product.category)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["cpu", "ram", "extra"]);
    }

    #[test]
    fn test_input_drops_foreign_specs() {
        let input = ProductInput {
            name: "Câble HDMI".into(),
            sku: "H1".into(),
            brand: String::new(),
            kind: String::new(),
            model: String::new(),
            description: String::new(),
            description2: String::new(),
            prices: ProductPrices::default(),
            guarantee: String::new(),
            national_range: false,
            image: String::new(),
            category: Category::Accessories,
            specs: [("cable", "USB Type A"), ("cpu", "i7")].into_iter().collect(),
        }
        .with_category_specs();
        assert_eq!(input.specs.get("cable"), Some("USB Type A"));
        assert_eq!(input.specs.get("cpu"), None);

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["role"], "accessoires");
        assert!(json["price"].is_number());
    }
}
