//! Core types for the IMP360 storefront.
//!
//! This module provides type-safe wrappers for the backend's domain concepts.

pub mod account;
pub mod cart;
pub mod category;
pub mod company;
pub mod email;
pub mod id;
pub mod identity;
mod lenient;
pub mod price;
pub mod product;
pub mod role;
pub mod ticket;
pub mod tier;

pub use account::{Account, AccountErrors, AccountInput, AccountSpecs, ClientSpecs};
pub use cart::{Cart, CartLine};
pub use category::{Category, SpecField};
pub use company::{Company, CompanyInput};
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, IdentityEnvelope, IdentityError};
pub use price::{Price, PriceError};
pub use product::{Product, ProductInput, ProductPrices, Specs};
pub use role::Role;
pub use ticket::{DeliveryType, TicketItem, TicketRequest};
pub use tier::Tier;
