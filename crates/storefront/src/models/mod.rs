//! Storefront-side models.
//!
//! Domain types live in `imp360_core`; this module only holds what the
//! storefront keeps in its own session.

pub mod session;

pub use session::{CachedIdentity, FlashKind, FlashMessage, keys as session_keys};
