//! IMP360 Core - Domain types and business rules.
//!
//! This crate provides the types and pure rules shared by the storefront:
//! - `types` - Ids, prices, roles, tiers, categories and the backend read models
//! - `pricing` - Resolution of the price shown to a viewer and snapshotted into the cart
//! - `access` - Route reachability by role and the company selection step
//! - `cart` - Cart quantity rules
//! - `ticket` - Order ticket assembly and contact validation
//! - `catalog` - Category filters and specification labels
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no logging. Every rule here is deterministic over its inputs.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod catalog;
#[cfg(test)]
mod fixtures;
pub mod pricing;
pub mod ticket;
pub mod types;

pub use types::*;
