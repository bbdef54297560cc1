//! Account profile: details, password and company.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use imp360_core::{Company, CompanyId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::middleware::{Flash, RequireIdentity};
use crate::services::IdentityStore;
use crate::state::AppState;
use crate::views::PageContext;

const PROFILE: &str = "/profile";

#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub email: String,
    pub name: String,
    pub glpi_id: String,
    pub role: &'static str,
    pub phone: String,
    pub companies: Vec<Company>,
    pub selected: Option<CompanyId>,
}

impl ProfileTemplate {
    fn is_selected(&self, company: &Company) -> bool {
        self.selected.as_ref() == Some(&company.id)
    }
}

/// Display the signed-in account.
pub async fn show(RequireIdentity(identity): RequireIdentity, page: PageContext) -> Response {
    ProfileTemplate {
        page,
        email: identity.email.to_string(),
        name: identity.display_name().to_owned(),
        glpi_id: identity.glpi_id.clone(),
        role: identity.role.label(),
        phone: identity.phone.clone().unwrap_or_default(),
        selected: identity.selected_company.as_ref().map(|c| c.id.clone()),
        companies: identity.companies,
    }
    .into_response()
}

/// Password change form data.
#[derive(Deserialize)]
pub struct PasswordForm {
    pub current_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

#[instrument(skip_all)]
pub async fn change_password(
    RequireIdentity(_identity): RequireIdentity,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    Form(form): Form<PasswordForm>,
) -> Response {
    if form.new_password.expose_secret() != form.confirm_password.expose_secret() {
        flash.error("Les mots de passe ne correspondent pas").await;
        return Redirect::to(PROFILE).into_response();
    }

    let changed = async {
        let backend = identity.backend_session().await?;
        state
            .backend()
            .change_password(
                &backend,
                form.current_password.expose_secret(),
                form.new_password.expose_secret(),
            )
            .await?;
        Ok::<_, AppError>(())
    }
    .await;

    match changed {
        Ok(()) => flash.success("Mot de passe modifié avec succès").await,
        Err(e) => {
            warn!(error = %e, "Password change failed");
            let message = match &e {
                AppError::Backend(backend) => backend.backend_message(),
                _ => None,
            }
            .unwrap_or("Erreur lors du changement de mot de passe")
            .to_string();
            flash.error(message).await;
        }
    }
    Redirect::to(PROFILE).into_response()
}

/// Company change form data.
#[derive(Debug, Deserialize)]
pub struct CompanyForm {
    #[serde(default)]
    pub company_id: String,
}

#[instrument(skip_all, fields(company_id = %form.company_id))]
pub async fn change_company(
    RequireIdentity(viewer): RequireIdentity,
    identity: IdentityStore,
    flash: Flash,
    Form(form): Form<CompanyForm>,
) -> Response {
    let company = CompanyId::new(form.company_id.trim());
    if !viewer.belongs_to(&company) {
        flash.error("Erreur lors du changement d'entreprise").await;
        return Redirect::to(PROFILE).into_response();
    }

    match identity.change_company(&company).await {
        Ok(_) => flash.success("Entreprise modifiée avec succès").await,
        Err(e) => {
            warn!(error = %e, "Company change failed");
            flash.error("Erreur lors du changement d'entreprise").await;
        }
    }
    Redirect::to(PROFILE).into_response()
}
