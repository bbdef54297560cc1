//! The company selection step.
//!
//! Users and clients pick the company they order for before reaching
//! company-scoped screens. The backend's answer replaces the cached
//! identity, so the selected company's tier applies immediately.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use imp360_core::access::Destination;
use imp360_core::{Company, CompanyId};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::middleware::{Buyer, Flash, RequireRole};
use crate::services::IdentityStore;
use crate::views::PageContext;

#[derive(Debug, Deserialize)]
pub struct SelectCompanyForm {
    #[serde(default)]
    pub company_id: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "company/select.html")]
pub struct SelectCompanyTemplate {
    pub page: PageContext,
    pub companies: Vec<Company>,
    pub selected: Option<CompanyId>,
}

impl SelectCompanyTemplate {
    fn is_selected(&self, company: &Company) -> bool {
        self.selected.as_ref() == Some(&company.id)
    }
}

pub async fn select_page(RequireRole { identity, .. }: RequireRole<Buyer>, page: PageContext) -> Response {
    SelectCompanyTemplate {
        page,
        selected: identity.selected_company.as_ref().map(|c| c.id.clone()),
        companies: identity.companies,
    }
    .into_response()
}

#[instrument(skip_all, fields(company_id = %form.company_id))]
pub async fn select(
    RequireRole { identity: viewer, .. }: RequireRole<Buyer>,
    identity: IdentityStore,
    flash: Flash,
    Form(form): Form<SelectCompanyForm>,
) -> Response {
    let company_id = form.company_id.trim();
    if company_id.is_empty() {
        flash.error("Veuillez sélectionner une entreprise").await;
        return Redirect::to(Destination::CompanySelection.path()).into_response();
    }

    let company = CompanyId::new(company_id);
    if !viewer.belongs_to(&company) {
        warn!("Company is not one of the account's companies");
        flash.error("Erreur lors de la sélection de l'entreprise").await;
        return Redirect::to(Destination::CompanySelection.path()).into_response();
    }

    match identity.select_company(&company).await {
        Ok(_) => {
            flash.success("Entreprise sélectionnée avec succès").await;
            Redirect::to(Destination::Landing.path()).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Company selection failed");
            flash.error("Erreur lors de la sélection de l'entreprise").await;
            Redirect::to(Destination::CompanySelection.path()).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::{
        body_text, get, identity, location, post_form, session_cookie, test_app, unreachable_state,
    };

    #[tokio::test]
    async fn test_staff_never_see_selection() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("moderator", None))).await;
        let response = get(&app, "/select-company", Some(&cookie)).await;
        assert_eq!(location(&response), Some("/dashboard"));
    }

    #[tokio::test]
    async fn test_lists_the_accounts_companies() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("client", None))).await;
        let response = get(&app, "/select-company", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Clinique du Parc"));
        assert!(body.contains("Cabinet Vauban"));
    }

    #[tokio::test]
    async fn test_empty_selection_is_refused() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("client", None))).await;

        let response = post_form(&app, "/select-company", Some(&cookie), "company_id=").await;
        assert_eq!(location(&response), Some("/select-company"));

        let page = body_text(get(&app, "/select-company", Some(&cookie)).await).await;
        assert!(page.contains("Veuillez sélectionner une entreprise"));
    }
}
