//! Sign-in and sign-out.
//!
//! Credentials are checked by the GLPI backend; the storefront keeps the
//! backend's session cookie and the identity it returned.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use imp360_core::Identity;
use imp360_core::access::{Destination, landing_route};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::middleware::Flash;
use crate::services::IdentityStore;
use crate::views::PageContext;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub error: Option<String>,
}

/// Where a fresh sign-in leads: users and clients always confirm the
/// company they order for, everyone else goes to the dashboard.
#[must_use]
pub const fn after_sign_in(identity: &Identity) -> Destination {
    if identity.role.requires_company_selection() {
        Destination::CompanySelection
    } else {
        Destination::Landing
    }
}

/// Display the login page. Signed-in viewers go to their landing page.
pub async fn login_page(page: PageContext) -> Response {
    if let Some(viewer) = &page.viewer {
        return Redirect::to(landing_route(Some(viewer)).path()).into_response();
    }
    LoginTemplate {
        page,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Login action.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(identity: IdentityStore, page: PageContext, Form(form): Form<LoginForm>) -> Response {
    let email = form.email.trim();
    match identity.sign_in(email, &form.password).await {
        Ok(signed_in) => Redirect::to(after_sign_in(&signed_in).path()).into_response(),
        Err(e) => {
            warn!(error = %e, "Sign-in failed");
            let error = match &e {
                AppError::Backend(backend) => backend.backend_message(),
                _ => None,
            }
            .unwrap_or("Erreur de connexion")
            .to_string();

            (
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    page,
                    email: email.to_string(),
                    error: Some(error),
                },
            )
                .into_response()
        }
    }
}

/// Logout action.
#[instrument(skip_all)]
pub async fn logout(identity: IdentityStore, flash: Flash) -> Response {
    if let Err(e) = identity.sign_out().await {
        warn!(error = %e, "Sign-out failed");
        flash.error("Erreur lors de la déconnexion").await;
    }
    Redirect::to(Destination::SignIn.path()).into_response()
}
