//! Display data shared by templates.
//!
//! Templates never see core types whose rendering depends on the viewer;
//! handlers convert them here first.

use imp360_core::pricing::{PriceView, resolve_price};
use imp360_core::{Category, Identity, Product, Role};

use crate::models::FlashMessage;

/// Per-request data every full page needs: navigation, cart badge and
/// pending notifications.
pub struct PageContext {
    pub viewer: Option<Identity>,
    pub cart_count: u32,
    pub flashes: Vec<FlashMessage>,
    pub search_debounce_ms: u128,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.viewer.is_some()
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role().is_some_and(Role::is_staff)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether the viewer orders for a company and may switch it.
    #[must_use]
    pub fn is_buyer(&self) -> bool {
        self.role().is_some_and(Role::requires_company_selection)
    }

    #[must_use]
    pub fn viewer_name(&self) -> &str {
        self.viewer.as_ref().map_or("", Identity::display_name)
    }

    /// Name of the company the viewer currently orders for.
    #[must_use]
    pub fn company_name(&self) -> Option<&str> {
        self.viewer
            .as_ref()
            .and_then(|v| v.selected_company.as_ref())
            .map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn categories(&self) -> Vec<CategoryLink> {
        Category::ALL.into_iter().map(CategoryLink::from).collect()
    }

    fn role(&self) -> Option<Role> {
        self.viewer.as_ref().map(|v| v.role)
    }
}

/// A category in the navigation or on the dashboard.
pub struct CategoryLink {
    pub label: &'static str,
    pub url: String,
}

impl From<Category> for CategoryLink {
    fn from(category: Category) -> Self {
        Self {
            label: category.label(),
            url: format!("/categorie/{}", category.slug()),
        }
    }
}

/// One labelled price of the staff breakdown.
pub struct PriceRow {
    pub label: &'static str,
    pub value: String,
}

/// A resolved price, formatted for display.
///
/// Either `primary` is set (with `struck` for discounted tiers) or
/// `breakdown` lists the four prices for staff.
pub struct PriceDisplay {
    pub primary: Option<String>,
    pub struck: Option<String>,
    pub tier: Option<&'static str>,
    pub breakdown: Vec<PriceRow>,
}

impl From<&PriceView> for PriceDisplay {
    fn from(view: &PriceView) -> Self {
        let tier = match view {
            PriceView::Tiered { tier, .. } | PriceView::Discounted { tier, .. } => {
                Some(tier.as_str())
            }
            PriceView::Public(_) | PriceView::Breakdown(_) => None,
        };
        let breakdown = match view {
            PriceView::Breakdown(prices) => vec![
                PriceRow {
                    label: "Prix public",
                    value: prices.public.to_string(),
                },
                PriceRow {
                    label: "Prix taux 1",
                    value: prices.tier1.to_string(),
                },
                PriceRow {
                    label: "Prix taux 2",
                    value: prices.tier2.to_string(),
                },
                PriceRow {
                    label: "Prix taux 3",
                    value: prices.tier3.to_string(),
                },
            ],
            _ => Vec::new(),
        };

        Self {
            primary: view.primary().map(|p| p.to_string()),
            struck: view.struck().map(|p| p.to_string()),
            tier,
            breakdown,
        }
    }
}

/// A product as listed on a category page or in search suggestions.
pub struct ProductCard {
    pub id: String,
    pub url: String,
    pub name: String,
    pub brand: String,
    pub kind: String,
    pub model: String,
    pub image: String,
    pub national_range: bool,
    pub price: PriceDisplay,
    /// First specifications of the product, labelled.
    pub highlights: Vec<(&'static str, String)>,
}

/// Specifications shown on a card.
const CARD_HIGHLIGHTS: usize = 3;

impl ProductCard {
    #[must_use]
    pub fn new(viewer: Option<&Identity>, product: &Product) -> Self {
        let highlights = product
            .category
            .map(|category| {
                category
                    .spec_fields()
                    .iter()
                    .filter_map(|field| {
                        product
                            .specs
                            .get(field.key)
                            .filter(|v| !v.trim().is_empty())
                            .map(|v| (field.label, v.to_owned()))
                    })
                    .take(CARD_HIGHLIGHTS)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: product.id.to_string(),
            url: format!("/product/{}", product.id),
            name: product.display_name().to_owned(),
            brand: product.brand.clone(),
            kind: product.kind.clone(),
            model: product.model.clone(),
            image: product.image.clone(),
            national_range: product.national_range,
            price: PriceDisplay::from(&resolve_price(viewer, product)),
            highlights,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::identity;
    use imp360_core::{Price, ProductId, ProductPrices, Specs};

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Écran 24 pouces".to_string(),
            sku: "EC24".to_string(),
            brand: "Iiyama".to_string(),
            kind: "Écran".to_string(),
            model: "XU2493".to_string(),
            description: String::new(),
            description2: None,
            prices: ProductPrices {
                public: Price::from_euros(100),
                tier1: Price::from_euros(80),
                tier2: Price::from_euros(70),
                tier3: Price::from_euros(60),
            },
            guarantee: None,
            national_range: false,
            image: String::new(),
            category: Some(Category::Screens),
            specs: [("displaysize", "24"), ("resolution", "1920x1080"), ("contrast", "")]
                .into_iter()
                .collect::<Specs>(),
        }
    }

    #[test]
    fn test_visitor_sees_public_price() {
        let card = ProductCard::new(None, &product());
        assert_eq!(card.price.primary.as_deref(), Some("100.00 €"));
        assert!(card.price.struck.is_none());
        assert!(card.price.breakdown.is_empty());
    }

    #[test]
    fn test_tier2_company_sees_struck_public_price() {
        let viewer = identity("client", Some("c2"));
        let card = ProductCard::new(Some(&viewer), &product());
        assert_eq!(card.price.primary.as_deref(), Some("70.00 €"));
        assert_eq!(card.price.struck.as_deref(), Some("100.00 €"));
        assert_eq!(card.price.tier, Some("taux2"));
    }

    #[test]
    fn test_staff_sees_breakdown() {
        let viewer = identity("moderator", None);
        let card = ProductCard::new(Some(&viewer), &product());
        assert!(card.price.primary.is_none());
        let values: Vec<_> = card.price.breakdown.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, ["100.00 €", "80.00 €", "70.00 €", "60.00 €"]);
    }

    #[test]
    fn test_highlights_skip_empty_specs() {
        let card = ProductCard::new(None, &product());
        assert_eq!(
            card.highlights,
            vec![("Taille écran", "24".to_string()), ("Résolution", "1920x1080".to_string())]
        );
    }
}
