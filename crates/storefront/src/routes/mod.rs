//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//!
//! # Auth
//! GET  /login                        - Login page
//! POST /login                        - Login action (rate limited)
//! POST /logout                       - Logout action
//! GET  /select-company               - Company selection (user, client)
//! POST /select-company               - Select the company to order for
//!
//! # Catalogue
//! GET  /dashboard                    - Category grid (after company selection)
//! GET  /categorie/{category}         - Product list with filters, grid or list view
//! GET  /product/{id}                 - Product detail
//! GET  /search/suggest?q=            - Search suggestions fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                         - Cart page and delivery form
//! POST /cart/add                     - Add to cart at the resolved price
//! POST /cart/quantity                - Increment, decrement or set a quantity
//! POST /cart/remove                  - Remove a line
//! POST /cart/clear                   - Empty the cart
//! POST /cart/ticket                  - Create the GLPI order ticket
//! GET  /cart/count                   - Cart count badge (fragment)
//!
//! # Profile (signed in)
//! GET  /profile                      - Account details
//! POST /profile/password             - Change password
//! POST /profile/company              - Change company
//!
//! # Products back-office (moderator, admin)
//! GET  /intern                       - Product table
//! GET  /new-product                  - Product form
//! POST /new-product                  - Create product (multipart)
//! GET  /modify-product/{id}          - Product form, filled in
//! POST /modify-product/{id}          - Update product (multipart)
//! POST /intern/{id}/delete           - Delete product
//!
//! # Clients back-office (admin)
//! GET  /admin                        - Clients and companies
//! GET  /new-client                   - Client form
//! POST /new-client                   - Create client
//! GET  /modify-client/{id}           - Client form, filled in
//! POST /modify-client/{id}           - Update client
//! POST /admin/clients/{id}/delete    - Delete client
//! POST /admin/companies              - Create company
//! POST /admin/companies/{id}         - Update company
//! POST /admin/companies/{id}/delete  - Delete company
//!
//! # Pages
//! GET  /mentionlegales               - Legal notice
//! GET  /politiqueconfidentialite     - Privacy policy
//!
//! *                                  - Redirect to the viewer's landing page
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod company;
pub mod intern;
pub mod pages;
pub mod profile;
pub mod search;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use imp360_core::access::{AppRoute, landing_route};

use crate::middleware::{OptionalIdentity, is_htmx, login_rate_limiter, navigate};
use crate::state::AppState;

/// Largest accepted product form, image included.
const PRODUCT_FORM_LIMIT: usize = 10 * 1024 * 1024;

/// Create the sign-in routes router.
fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let login = if rate_limited {
        post(auth::login).layer(login_rate_limiter())
    } else {
        post(auth::login)
    };

    Router::new()
        .route(AppRoute::Login.path(), get(auth::login_page).merge(login))
        .route("/logout", post(auth::logout))
        .route(
            AppRoute::SelectCompany.path(),
            get(company::select_page).post(company::select),
        )
}

/// Create the catalogue routes router.
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(AppRoute::Dashboard.path(), get(catalog::dashboard))
        .route(AppRoute::Category.path(), get(catalog::category))
        .route(AppRoute::ProductDetails.path(), get(catalog::product))
        .route("/search/suggest", get(search::suggest))
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/quantity", post(cart::quantity))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/ticket", post(cart::ticket))
        .route("/count", get(cart::count))
}

/// Create the profile routes router.
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show))
        .route("/password", post(profile::change_password))
        .route("/company", post(profile::change_company))
}

/// Create the products back-office router.
fn intern_routes() -> Router<AppState> {
    Router::new()
        .route(AppRoute::Intern.path(), get(intern::index))
        .route(
            AppRoute::NewProduct.path(),
            get(intern::new_product).post(intern::create_product),
        )
        .route(
            AppRoute::ModifyProduct.path(),
            get(intern::edit_product).post(intern::update_product),
        )
        .route("/intern/{id}/delete", post(intern::delete_product))
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT))
}

/// Create the clients and companies back-office router.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(AppRoute::Admin.path(), get(admin::index))
        .route(
            AppRoute::NewClient.path(),
            get(admin::new_client).post(admin::create_client),
        )
        .route(
            AppRoute::ModifyClient.path(),
            get(admin::edit_client).post(admin::update_client),
        )
        .route("/admin/clients/{id}/delete", post(admin::delete_client))
        .route("/admin/companies", post(admin::create_company))
        .route("/admin/companies/{id}", post(admin::update_company))
        .route("/admin/companies/{id}/delete", post(admin::delete_company))
}

/// Create all routes for the storefront.
pub fn routes(login_rate_limited: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth_routes(login_rate_limited))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/profile", profile_routes())
        .merge(intern_routes())
        .merge(admin_routes())
        .merge(pages::router())
        .fallback(landing)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Unknown paths lead to the viewer's landing page.
async fn landing(
    OptionalIdentity(viewer): OptionalIdentity,
    headers: axum::http::HeaderMap,
) -> Response {
    navigate(landing_route(viewer.as_ref()).path(), is_htmx(&headers)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::{get, identity, location, session_cookie, test_app, unreachable_state};

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app(unreachable_state());
        let response = get(&app, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_follows_landing_route() {
        let (app, store) = test_app(unreachable_state());

        let response = get(&app, "/nulle-part", None).await;
        assert_eq!(location(&response), Some("/login"));

        let cookie = session_cookie(&store, Some(&identity("user", None))).await;
        let response = get(&app, "/nulle-part", Some(&cookie)).await;
        assert_eq!(location(&response), Some("/select-company"));

        let cookie = session_cookie(&store, Some(&identity("admin", None))).await;
        let response = get(&app, "/", Some(&cookie)).await;
        assert_eq!(location(&response), Some("/dashboard"));
    }
}
