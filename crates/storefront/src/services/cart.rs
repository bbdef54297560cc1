//! The cart read model and its mutations.

use imp360_core::cart::{QuantityChange, next_quantity};
use imp360_core::ticket::TicketDraft;
use imp360_core::{Cart, Identity, Price, Product, ProductId};
use tower_sessions::Session;
use tracing::{instrument, warn};

use super::backend_session;
use crate::backend::{BackendClient, BackendSession};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Cart of one browser session.
///
/// Every backend cart call answers with the full line list; the store
/// keeps the badge count in step with the latest answer.
#[derive(Clone)]
pub struct CartStore {
    session: Session,
    backend: BackendClient,
}

impl CartStore {
    #[must_use]
    pub fn new(session: Session, state: &AppState) -> Self {
        Self {
            session,
            backend: state.backend().clone(),
        }
    }

    async fn backend_session(&self) -> Result<BackendSession> {
        Ok(backend_session(&self.session).await?)
    }

    async fn record(&self, cart: Cart) -> Result<Cart> {
        self.session
            .insert(session_keys::CART_COUNT, cart.item_count())
            .await?;
        Ok(cart)
    }

    /// Current cart lines. Visitors without a backend session have an
    /// empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call or the session store fails.
    #[instrument(skip(self))]
    pub async fn lines(&self) -> Result<Cart> {
        let backend = self.backend_session().await?;
        if backend.is_anonymous() {
            return Ok(Cart::default());
        }
        let cart = self.backend.cart(&backend).await?;
        self.record(cart).await
    }

    /// Units in the cart for the navigation badge.
    ///
    /// Uses the cached count when there is one; failures show an empty badge.
    pub async fn count(&self) -> u32 {
        match self.session.get::<u32>(session_keys::CART_COUNT).await {
            Ok(Some(count)) => count,
            Ok(None) => match self.lines().await {
                Ok(cart) => cart.item_count(),
                Err(e) => {
                    warn!(error = %e, "Failed to load cart count");
                    0
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read cart count");
                0
            }
        }
    }

    /// Add one unit of `product` at the already resolved `price`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product, price: Price) -> Result<Cart> {
        let backend = self.backend_session().await?;
        let cart = self.backend.add_to_cart(&backend, &product.id, price).await?;
        let unit_price = price.to_string();
        add_breadcrumb(
            "cart",
            "Added product",
            Some(&[("product_id", product.id.as_str()), ("price", unit_price.as_str())]),
        );
        self.record(cart).await
    }

    /// Apply a quantity change to the line the backend holds for `product`.
    ///
    /// Increments and decrements start from the backend's quantity, never
    /// from one posted by the page.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` without updating the backend when the result
    /// would be below one, and `AppError::NotFound` when the product is not
    /// in the cart.
    #[instrument(skip(self))]
    pub async fn change_quantity(
        &self,
        product: &ProductId,
        change: QuantityChange,
    ) -> Result<Cart> {
        let quantity = match change {
            QuantityChange::Set(_) => next_quantity(0, change)?,
            QuantityChange::Increment | QuantityChange::Decrement => {
                let cart = self.lines().await?;
                let current = cart
                    .line(product)
                    .map(|line| line.quantity)
                    .ok_or_else(|| AppError::NotFound(format!("ligne de panier {product}")))?;
                next_quantity(current, change)?
            }
        };
        let backend = self.backend_session().await?;
        let cart = self
            .backend
            .update_cart_quantity(&backend, product, quantity)
            .await?;
        self.record(cart).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, product: &ProductId) -> Result<Cart> {
        let backend = self.backend_session().await?;
        let cart = self.backend.remove_from_cart(&backend, product).await?;
        self.record(cart).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart> {
        let backend = self.backend_session().await?;
        let cart = self.backend.clear_cart(&backend).await?;
        self.record(cart).await
    }

    /// Turn the cart into an order ticket.
    ///
    /// The cart is emptied once the backend accepted the ticket, whatever
    /// the response body says. A failed ticket leaves the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ticket` if the ticket cannot be assembled, or
    /// `AppError::Backend` if GLPI refused it.
    #[instrument(skip(self, draft, viewer))]
    pub async fn submit_ticket(&self, draft: &TicketDraft, viewer: Option<&Identity>) -> Result<()> {
        let cart = self.lines().await?;
        let ticket = draft.build(viewer, &cart)?;

        let backend = self.backend_session().await?;
        self.backend.create_ticket(&backend, &ticket).await?;
        add_breadcrumb("cart", "Ticket created", None);

        if let Err(e) = self.clear().await {
            warn!(error = %e, "Ticket created but the cart could not be cleared");
            self.record(Cart::default()).await?;
        }
        Ok(())
    }
}
