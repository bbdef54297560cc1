//! Session-scoped stores for storefront.
//!
//! # Services
//!
//! - `identity` - The signed-in identity: sign-in, revalidation, company selection
//! - `cart` - The cart: lines, badge count, quantity changes, ticket submission
//!
//! Each store is the only writer of its cached values in the session.
//! Handlers obtain them as extractors and never touch those keys directly.

pub mod cart;
pub mod identity;

pub use cart::CartStore;
pub use identity::IdentityStore;

use tower_sessions::Session;

use crate::backend::BackendSession;
use crate::models::session_keys;

/// The backend session stored in the storefront session, if any.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn backend_session(
    session: &Session,
) -> Result<BackendSession, tower_sessions::session::Error> {
    Ok(session
        .get::<String>(session_keys::BACKEND_COOKIE)
        .await?
        .map_or_else(BackendSession::anonymous, BackendSession::from_cookie))
}
