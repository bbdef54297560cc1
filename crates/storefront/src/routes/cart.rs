//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The backend holds the cart; every mutation answers with the full line
//! list, which is re-rendered as is. Notifications ride along as
//! out-of-band toasts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use imp360_core::cart::QuantityChange;
use imp360_core::pricing::resolve_price;
use imp360_core::ticket::{ContactErrors, ContactForm, TicketDraft, TicketError};
use imp360_core::{Cart, CartLine, DeliveryType, ProductId, Role};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::middleware::Flash;
use crate::models::FlashMessage;
use crate::services::{CartStore, IdentityStore};
use crate::state::AppState;
use crate::views::PageContext;

const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Cart line display data for templates.
pub struct CartLineView {
    pub product_id: String,
    pub url: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub subtotal: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id().to_string(),
            url: format!("/product/{}", line.product_id()),
            name: line.product.display_name().to_owned(),
            image: line.product.image.clone(),
            quantity: line.quantity,
            price: line.price.to_string(),
            subtotal: line.subtotal().to_string(),
        }
    }
}

/// Cart display data for templates.
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            total: cart.total().to_string(),
            item_count: cart.item_count(),
        }
    }
}

impl CartView {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A delivery option of the ticket form.
pub struct DeliveryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn delivery_options(selected: DeliveryType) -> Vec<DeliveryOption> {
    DeliveryType::ALL
        .into_iter()
        .map(|delivery| DeliveryOption {
            value: delivery.as_str(),
            label: delivery.label(),
            selected: delivery == selected,
        })
        .collect()
}

/// Delivery and contact form data.
#[derive(Debug, Default, Deserialize)]
pub struct TicketForm {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub company: String,
}

impl TicketForm {
    fn draft(&self) -> TicketDraft {
        TicketDraft {
            contact: ContactForm {
                client_name: self.client_name.clone(),
                client_phone: self.client_phone.clone(),
                client_email: self.client_email.clone(),
            },
            delivery: self.delivery_type,
            company: Some(self.company.clone()),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Quantity form data.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub product_id: String,
    pub action: String,
    pub quantity: Option<u32>,
}

impl QuantityForm {
    fn change(&self) -> Option<QuantityChange> {
        match self.action.as_str() {
            "increment" => Some(QuantityChange::Increment),
            "decrement" => Some(QuantityChange::Decrement),
            "set" => self.quantity.map(QuantityChange::Set),
            _ => None,
        }
    }
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub form: TicketForm,
    pub errors: ContactErrors,
    pub deliveries: Vec<DeliveryOption>,
}

impl CartShowTemplate {
    fn new(page: PageContext, cart: &Cart, form: TicketForm, errors: ContactErrors) -> Self {
        Self {
            deliveries: delivery_options(form.delivery_type),
            cart: CartView::from(cart),
            page,
            form,
            errors,
        }
    }

    /// Clients order for themselves; the form is replaced by their profile.
    fn is_client(&self) -> bool {
        self.role() == Some(Role::Client)
    }

    fn is_moderator(&self) -> bool {
        self.role() == Some(Role::Moderator)
    }

    fn role(&self) -> Option<Role> {
        self.page.viewer.as_ref().map(|v| v.role)
    }
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_update.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub flashes: Vec<FlashMessage>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
    pub flashes: Vec<FlashMessage>,
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(cart: CartStore, mut page: PageContext) -> Response {
    let lines = match cart.lines().await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, "Failed to load cart");
            page.flashes
                .push(FlashMessage::error("Impossible de charger le panier"));
            Cart::default()
        }
    };
    CartShowTemplate::new(page, &lines, TicketForm::default(), ContactErrors::default())
        .into_response()
}

/// Add one unit to the cart at the viewer's price (HTMX).
///
/// Answers with the badge and a toast; the `cart-updated` trigger lets
/// other parts of the page refresh.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    identity: IdentityStore,
    cart: CartStore,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let added = async {
        let viewer = identity.current().await?;
        let backend = identity.backend_session().await?;
        let product = state
            .backend()
            .product(&backend, &ProductId::new(form.product_id.clone()))
            .await?;
        let price = resolve_price(viewer.as_ref(), &product).cart_price();
        let lines = cart.add(&product, price).await?;
        Ok::<_, AppError>((product, lines))
    }
    .await;

    match added {
        Ok((product, lines)) => (
            AppendHeaders([CART_UPDATED]),
            CartCountTemplate {
                count: lines.item_count(),
                flashes: vec![FlashMessage::success(format!(
                    "{} a été ajouté au panier",
                    product.display_name()
                ))],
            },
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to add product to cart");
            CartCountTemplate {
                count: cart.count().await,
                flashes: vec![FlashMessage::error("Impossible d'ajouter le produit au panier")],
            }
            .into_response()
        }
    }
}

/// Re-render the lines after a failed mutation, with `message` as a toast.
async fn items_after_failure(cart: &CartStore, message: &str) -> Response {
    let lines = cart.lines().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to reload cart");
        Cart::default()
    });
    CartItemsTemplate {
        cart: CartView::from(&lines),
        flashes: vec![FlashMessage::error(message)],
    }
    .into_response()
}

fn items_updated(lines: &Cart) -> Response {
    (
        AppendHeaders([CART_UPDATED]),
        CartItemsTemplate {
            cart: CartView::from(lines),
            flashes: Vec::new(),
        },
    )
        .into_response()
}

/// Increment, decrement or set a line's quantity (HTMX).
#[instrument(skip_all, fields(product_id = %form.product_id, action = %form.action))]
pub async fn quantity(cart: CartStore, Form(form): Form<QuantityForm>) -> Response {
    let Some(change) = form.change() else {
        return AppError::BadRequest("Action inconnue".to_string()).into_response();
    };

    match cart
        .change_quantity(&ProductId::new(form.product_id.clone()), change)
        .await
    {
        Ok(lines) => items_updated(&lines),
        Err(AppError::Cart(e)) => {
            warn!(error = %e, "Quantity change refused");
            items_after_failure(&cart, "La quantité doit être au moins 1").await
        }
        Err(e) => {
            warn!(error = %e, "Failed to update quantity");
            items_after_failure(&cart, "Erreur lors de la mise à jour de la quantité").await
        }
    }
}

/// Remove a line (HTMX).
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn remove(cart: CartStore, Form(form): Form<RemoveFromCartForm>) -> Response {
    match cart.remove(&ProductId::new(form.product_id.clone())).await {
        Ok(lines) => items_updated(&lines),
        Err(e) => {
            warn!(error = %e, "Failed to remove product from cart");
            items_after_failure(&cart, "Erreur lors de la suppression du produit").await
        }
    }
}

/// Empty the cart (HTMX).
#[instrument(skip_all)]
pub async fn clear(cart: CartStore) -> Response {
    match cart.clear().await {
        Ok(lines) => items_updated(&lines),
        Err(e) => {
            warn!(error = %e, "Failed to clear cart");
            items_after_failure(&cart, "Erreur lors de la suppression du panier").await
        }
    }
}

/// Turn the cart into a GLPI ticket.
///
/// Invalid contact details re-render the page with the field messages;
/// everything else redirects back to the cart with a notification.
#[instrument(skip_all, fields(delivery = %form.delivery_type.as_str()))]
pub async fn ticket(
    cart: CartStore,
    flash: Flash,
    mut page: PageContext,
    Form(form): Form<TicketForm>,
) -> Response {
    let draft = form.draft();
    match cart.submit_ticket(&draft, page.viewer.as_ref()).await {
        Ok(()) => {
            flash.success("Le ticket GLPI a été créé avec succès.").await;
            Redirect::to("/cart").into_response()
        }
        Err(AppError::Ticket(TicketError::InvalidContact(errors))) => {
            page.flashes.push(FlashMessage::error(
                "Veuillez remplir tous les champs obligatoires correctement.",
            ));
            let lines = cart.lines().await.unwrap_or_default();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                CartShowTemplate::new(page, &lines, form, errors),
            )
                .into_response()
        }
        Err(AppError::Ticket(TicketError::EmptyCart)) => {
            flash.error("Votre panier est vide").await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Ticket creation failed");
            let message = match &e {
                AppError::Backend(backend) => backend.backend_message(),
                _ => None,
            }
            .unwrap_or("Impossible de créer le ticket GLPI.")
            .to_string();
            flash.error(message).await;
            Redirect::to("/cart").into_response()
        }
    }
}

/// Cart count badge (HTMX).
pub async fn count(cart: CartStore) -> impl IntoResponse {
    CartCountTemplate {
        count: cart.count().await,
        flashes: Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{
        body_text, get, identity, location, post_form, session_cookie, test_app, unreachable_state,
    };

    #[test]
    fn test_quantity_actions() {
        let form = |action: &str, quantity| QuantityForm {
            product_id: "p1".into(),
            action: action.into(),
            quantity,
        };
        assert_eq!(form("increment", None).change(), Some(QuantityChange::Increment));
        assert_eq!(form("decrement", None).change(), Some(QuantityChange::Decrement));
        assert_eq!(form("set", Some(5)).change(), Some(QuantityChange::Set(5)));
        assert_eq!(form("set", None).change(), None);
        assert_eq!(form("double", None).change(), None);
    }

    #[test]
    fn test_delivery_options_mark_selection() {
        let options = delivery_options(DeliveryType::Imp360);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.value).collect();
        assert_eq!(selected, ["imp360"]);
        assert_eq!(options.len(), 3);
    }

    #[tokio::test]
    async fn test_visitor_sees_empty_cart() {
        let (app, _) = test_app(unreachable_state());
        let response = get(&app, "/cart", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Votre panier est vide"));
    }

    #[tokio::test]
    async fn test_zero_quantity_never_reaches_backend() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("user", Some("c1")))).await;
        let response = post_form(
            &app,
            "/cart/quantity",
            Some(&cookie),
            "product_id=p1&action=set&quantity=0",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("La quantité doit être au moins 1"));
    }

    #[tokio::test]
    async fn test_failed_add_shows_toast() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("user", Some("c1")))).await;
        let response = post_form(&app, "/cart/add", Some(&cookie), "product_id=p1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("HX-Trigger").is_none());
        assert!(body_text(response).await.contains("ajouter le produit au panier"));
    }

    #[tokio::test]
    async fn test_empty_cart_ticket_is_refused() {
        let (app, _) = test_app(unreachable_state());
        let response = post_form(
            &app,
            "/cart/ticket",
            None,
            "client_name=L%C3%A9a&client_phone=0611223344&client_email=lea%40cabinet.fr&delivery_type=technician",
        )
        .await;
        assert_eq!(location(&response), Some("/cart"));
    }
}
