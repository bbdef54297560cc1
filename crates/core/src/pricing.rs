//! Tier price resolution.
//!
//! Decides which of a product's four prices a viewer sees and which one is
//! captured into a cart line. Resolution is priority ordered:
//!
//! 1. No identity: the public price.
//! 2. Moderators and administrators: all four prices (inspection view).
//! 3. Users and clients with a selected company: the price of the company's
//!    tier. Tier-2 and tier-3 also carry the public price to show struck
//!    through. An untagged company falls back to the public price.
//! 4. Anything else: the public price.

use crate::types::{Identity, Price, Product, ProductPrices, Tier};

/// All four prices of a product, labelled for the staff view.
pub type PriceBreakdown = ProductPrices;

/// The price presentation resolved for a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceView {
    /// The public price.
    Public(Price),
    /// Tier-1 price.
    Tiered { price: Price, tier: Tier },
    /// Tier-2 or tier-3 price, shown next to the struck public price.
    Discounted {
        price: Price,
        struck: Price,
        tier: Tier,
    },
    /// Every price, for staff.
    Breakdown(PriceBreakdown),
}

impl PriceView {
    /// The single price displayed to the viewer, if there is one.
    #[must_use]
    pub const fn primary(&self) -> Option<Price> {
        match self {
            Self::Public(price) | Self::Tiered { price, .. } | Self::Discounted { price, .. } => {
                Some(*price)
            }
            Self::Breakdown(_) => None,
        }
    }

    /// The public price to show struck through.
    #[must_use]
    pub const fn struck(&self) -> Option<Price> {
        match self {
            Self::Discounted { struck, .. } => Some(*struck),
            _ => None,
        }
    }

    /// Unit price captured when the product is added to the cart.
    ///
    /// The staff view has no single price, so staff carts use the public
    /// price.
    #[must_use]
    pub const fn cart_price(&self) -> Price {
        match self {
            Self::Public(price) | Self::Tiered { price, .. } | Self::Discounted { price, .. } => {
                *price
            }
            Self::Breakdown(prices) => prices.public,
        }
    }
}

/// Resolve the price view of `product` for `viewer`.
#[must_use]
pub fn resolve_price(viewer: Option<&Identity>, product: &Product) -> PriceView {
    let prices = &product.prices;

    let Some(identity) = viewer else {
        return PriceView::Public(prices.public);
    };

    if identity.role.is_staff() {
        return PriceView::Breakdown(*prices);
    }

    let tier = identity
        .selected_company
        .as_ref()
        .filter(|_| identity.role.requires_company_selection())
        .and_then(|company| company.tier);

    match tier {
        Some(tier @ Tier::Tier1) => PriceView::Tiered {
            price: prices.for_tier(tier),
            tier,
        },
        Some(tier @ (Tier::Tier2 | Tier::Tier3)) => PriceView::Discounted {
            price: prices.for_tier(tier),
            struck: prices.public,
            tier,
        },
        None => PriceView::Public(prices.public),
    }
}
