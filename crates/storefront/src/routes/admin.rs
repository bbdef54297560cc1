//! Clients and companies back-office, administrators only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use imp360_core::{
    Account, AccountErrors, AccountInput, AccountSpecs, ClientSpecs, Company, CompanyId,
    CompanyInput, Role, Tier, UserId,
};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::backend::BackendSession;
use crate::error::AppError;
use crate::middleware::{AdminOnly, Flash, RequireRole, is_htmx, navigate};
use crate::models::FlashMessage;
use crate::services::IdentityStore;
use crate::state::AppState;
use crate::views::PageContext;

const ADMIN: &str = "/admin";
const COMPANIES_TAB: &str = "/admin?tab=companies";

// =============================================================================
// Overview
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    pub tab: Option<String>,
}

/// A row of the clients table.
pub struct ClientRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub glpi_id: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&Account> for ClientRow {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            glpi_id: account.glpi_id.clone(),
            role: account.role,
            created_at: account
                .created_at
                .map(|at| at.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// A tier of the company selects; the empty value leaves it untagged.
pub struct TierOption {
    pub value: &'static str,
    pub label: &'static str,
}

const TIER_OPTIONS: [TierOption; 4] = [
    TierOption {
        value: "",
        label: "Non défini",
    },
    TierOption {
        value: "taux1",
        label: "taux1",
    },
    TierOption {
        value: "taux2",
        label: "taux2",
    },
    TierOption {
        value: "taux3",
        label: "taux3",
    },
];

#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub page: PageContext,
    pub companies_tab: bool,
    pub clients: Vec<ClientRow>,
    pub companies: Vec<Company>,
    pub tiers: &'static [TierOption],
}

impl AdminTemplate {
    fn count(&self, role: Role) -> usize {
        self.clients.iter().filter(|c| c.role == role).count()
    }

    fn admin_count(&self) -> usize {
        self.count(Role::Admin)
    }

    fn moderator_count(&self) -> usize {
        self.count(Role::Moderator)
    }

    fn tier_value(&self, company: &Company) -> &'static str {
        company.tier.map_or("", Tier::as_str)
    }
}

/// Clients and companies, with the clients' role counts.
#[instrument(skip_all)]
pub async fn index(
    RequireRole { .. }: RequireRole<AdminOnly>,
    identity: IdentityStore,
    State(state): State<AppState>,
    mut page: PageContext,
    Query(query): Query<TabQuery>,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    let (users, companies) = tokio::join!(
        state.backend().users(&backend),
        state.backend().companies(&backend),
    );

    let clients = users.unwrap_or_else(|e| {
        warn!(error = %e, "Impossible de charger les clients");
        page.flashes
            .push(FlashMessage::error("Impossible de charger les clients"));
        Vec::new()
    });
    let companies = companies.unwrap_or_else(|e| {
        warn!(error = %e, "Impossible de charger les entreprises");
        page.flashes
            .push(FlashMessage::error("Impossible de charger les entreprises"));
        Vec::new()
    });

    Ok(AdminTemplate {
        page,
        companies_tab: query.tab.as_deref() == Some("companies"),
        clients: clients.iter().map(ClientRow::from).collect(),
        companies,
        tiers: &TIER_OPTIONS,
    }
    .into_response())
}

// =============================================================================
// Client form
// =============================================================================

/// Values of the client form, as typed.
#[derive(Debug, Clone, Default)]
pub struct ClientFormValues {
    pub email: String,
    pub password: String,
    pub name: String,
    pub glpi_id: String,
    pub role: Option<Role>,
    pub phone: String,
    pub address: String,
    pub companies: Vec<CompanyId>,
    pub selected_company: Option<CompanyId>,
}

impl From<&Account> for ClientFormValues {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            password: String::new(),
            name: account.name.clone(),
            glpi_id: account.glpi_id.clone(),
            role: Some(account.role),
            phone: account.phone.clone(),
            address: account.address.clone(),
            companies: account.companies.clone(),
            selected_company: account.selected_company.clone(),
        }
    }
}

impl ClientFormValues {
    /// Read the form's pairs; `companies` repeats once per ticked company.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut values = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "email" => values.email = value,
                "password" => values.password = value,
                "name" => values.name = value,
                "glpi_id" => values.glpi_id = value,
                "role" => values.role = value.parse().ok(),
                "phone" => values.phone = value,
                "address" => values.address = value,
                "companies" if !value.is_empty() => values.companies.push(CompanyId::new(value)),
                "selected_company" if !value.is_empty() => {
                    values.selected_company = Some(CompanyId::new(value));
                }
                _ => {}
            }
        }
        values
    }

    fn to_input(&self) -> AccountInput {
        let role = self.role.unwrap_or(Role::User);
        // Contact details only apply to client accounts.
        let client = if role == Role::Client {
            ClientSpecs {
                phone: self.phone.trim().to_owned(),
                address: self.address.trim().to_owned(),
            }
        } else {
            ClientSpecs::default()
        };
        AccountInput {
            email: self.email.trim().to_owned(),
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
            name: self.name.trim().to_owned(),
            role,
            glpi_id: self.glpi_id.trim().to_owned(),
            companies: self.companies.clone(),
            selected_company: self.selected_company.clone(),
            specs: AccountSpecs { client },
        }
    }
}

/// A role of the client form.
pub struct RoleOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// A company of the client form.
pub struct CompanyChoice {
    pub id: String,
    pub name: String,
    pub checked: bool,
    pub is_default: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/client_form.html")]
pub struct ClientFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub creating: bool,
    pub values: ClientFormValues,
    pub errors: AccountErrors,
    pub roles: Vec<RoleOption>,
    pub companies: Vec<CompanyChoice>,
}

impl ClientFormTemplate {
    fn new(
        page: PageContext,
        target: Option<&str>,
        values: ClientFormValues,
        errors: AccountErrors,
        companies: &[Company],
    ) -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| RoleOption {
                value: role.as_str(),
                label: role.label(),
                selected: values.role == Some(role),
            })
            .collect();
        let companies = companies
            .iter()
            .map(|company| CompanyChoice {
                id: company.id.to_string(),
                name: company.name.clone(),
                checked: values.companies.contains(&company.id),
                is_default: values.selected_company.as_ref() == Some(&company.id),
            })
            .collect();

        Self {
            page,
            title: if target.is_some() { "Modifier le client" } else { "Nouveau client" },
            action: target.map_or_else(|| "/new-client".to_string(), |id| format!("/modify-client/{id}")),
            creating: target.is_none(),
            values,
            errors,
            roles,
            companies,
        }
    }

    fn is_client(&self) -> bool {
        self.values.role == Some(Role::Client)
    }
}

/// Companies offered by the client form; a failure leaves the list empty.
async fn company_choices(
    state: &AppState,
    backend: &BackendSession,
    page: &mut PageContext,
) -> Vec<Company> {
    state.backend().companies(backend).await.unwrap_or_else(|e| {
        warn!(error = %e, "Impossible de charger la liste des entreprises");
        page.flashes
            .push(FlashMessage::error("Impossible de charger la liste des entreprises"));
        Vec::new()
    })
}

pub async fn new_client(
    RequireRole { .. }: RequireRole<AdminOnly>,
    identity: IdentityStore,
    State(state): State<AppState>,
    mut page: PageContext,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    let companies = company_choices(&state, &backend, &mut page).await;
    let values = ClientFormValues {
        role: Some(Role::User),
        ..ClientFormValues::default()
    };
    Ok(ClientFormTemplate::new(page, None, values, AccountErrors::default(), &companies).into_response())
}

#[instrument(skip_all)]
pub async fn create_client(
    RequireRole { .. }: RequireRole<AdminOnly>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    mut page: PageContext,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let values = ClientFormValues::from_pairs(pairs);
    let input = values.to_input();
    let backend = identity.backend_session().await?;

    let (status, errors) = match input.validate(true) {
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
        Ok(()) => match state.backend().create_user(&backend, &input).await {
            Ok(()) => {
                flash.success("Client créé avec succès").await;
                return Ok(navigate(ADMIN, false));
            }
            Err(e) => {
                warn!(error = %e, "Client creation failed");
                page.flashes
                    .push(FlashMessage::error("Impossible de créer le client"));
                (StatusCode::BAD_GATEWAY, AccountErrors::default())
            }
        },
    };

    let companies = company_choices(&state, &backend, &mut page).await;
    Ok((status, ClientFormTemplate::new(page, None, values, errors, &companies)).into_response())
}

/// The client form, filled in with the stored account.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn edit_client(
    RequireRole { .. }: RequireRole<AdminOnly>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    mut page: PageContext,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    let account = match state.backend().user(&backend, &UserId::new(id.clone())).await {
        Ok(account) => account,
        Err(e) => {
            warn!(error = %e, "Impossible de charger les informations du client");
            flash
                .error("Impossible de charger les informations du client")
                .await;
            return Ok(navigate(ADMIN, false));
        }
    };
    let companies = company_choices(&state, &backend, &mut page).await;
    Ok(ClientFormTemplate::new(
        page,
        Some(&id),
        ClientFormValues::from(&account),
        AccountErrors::default(),
        &companies,
    )
    .into_response())
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn update_client(
    RequireRole { .. }: RequireRole<AdminOnly>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    mut page: PageContext,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let values = ClientFormValues::from_pairs(pairs);
    // An empty password keeps the current one.
    let input = values.to_input();
    let backend = identity.backend_session().await?;

    let (status, errors) = match input.validate(false) {
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
        Ok(()) => match state
            .backend()
            .update_user(&backend, &UserId::new(id.clone()), &input)
            .await
        {
            Ok(()) => {
                flash.success("Client modifié avec succès").await;
                return Ok(navigate(ADMIN, false));
            }
            Err(e) => {
                warn!(error = %e, "Client update failed");
                page.flashes
                    .push(FlashMessage::error("Impossible de modifier le client"));
                (StatusCode::BAD_GATEWAY, AccountErrors::default())
            }
        },
    };

    let companies = company_choices(&state, &backend, &mut page).await;
    Ok((status, ClientFormTemplate::new(page, Some(&id), values, errors, &companies)).into_response())
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn delete_client(
    RequireRole { .. }: RequireRole<AdminOnly>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    match state.backend().delete_user(&backend, &UserId::new(id)).await {
        Ok(()) => flash.success("Client supprimé avec succès").await,
        Err(e) => {
            warn!(error = %e, "Client deletion failed");
            flash.error("Impossible de supprimer le client").await;
        }
    }
    Ok(navigate(ADMIN, is_htmx(&headers)))
}

// =============================================================================
// Companies
// =============================================================================

/// Company form data.
#[derive(Debug, Deserialize)]
pub struct CompanyForm {
    #[serde(default)]
    pub glpi_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tier: String,
}

impl CompanyForm {
    fn to_input(&self) -> CompanyInput {
        CompanyInput {
            glpi_id: self.glpi_id.trim().to_owned(),
            name: self.name.trim().to_owned(),
            tier: Tier::from_tag(&self.tier),
        }
    }
}

#[instrument(skip_all, fields(name = %form.name))]
pub async fn create_company(
    RequireRole { .. }: RequireRole<AdminOnly>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    Form(form): Form<CompanyForm>,
) -> Result<Response, AppError> {
    let input = form.to_input();
    if let Err(message) = input.validate() {
        flash.error(message).await;
        return Ok(navigate(COMPANIES_TAB, false));
    }

    let backend = identity.backend_session().await?;
    match state.backend().create_company(&backend, &input).await {
        Ok(()) => flash.success("Entreprise créée avec succès").await,
        Err(e) => {
            warn!(error = %e, "Company creation failed");
            flash.error("Impossible de créer l'entreprise").await;
        }
    }
    Ok(navigate(COMPANIES_TAB, false))
}

#[instrument(skip_all, fields(company_id = %id))]
pub async fn update_company(
    RequireRole { .. }: RequireRole<AdminOnly>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    Form(form): Form<CompanyForm>,
) -> Result<Response, AppError> {
    let input = form.to_input();
    if let Err(message) = input.validate() {
        flash.error(message).await;
        return Ok(navigate(COMPANIES_TAB, false));
    }

    let backend = identity.backend_session().await?;
    match state
        .backend()
        .update_company(&backend, &CompanyId::new(id), &input)
        .await
    {
        Ok(()) => flash.success("Entreprise modifiée avec succès").await,
        Err(e) => {
            warn!(error = %e, "Company update failed");
            flash.error("Impossible de modifier l'entreprise").await;
        }
    }
    Ok(navigate(COMPANIES_TAB, false))
}

#[instrument(skip_all, fields(company_id = %id))]
pub async fn delete_company(
    RequireRole { .. }: RequireRole<AdminOnly>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    match state.backend().delete_company(&backend, &CompanyId::new(id)).await {
        Ok(()) => flash.success("Entreprise supprimée avec succès").await,
        Err(e) => {
            warn!(error = %e, "Company deletion failed");
            flash.error("Impossible de supprimer l'entreprise").await;
        }
    }
    Ok(navigate(COMPANIES_TAB, is_htmx(&headers)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{
        body_text, get, identity, location, post_form, session_cookie, test_app, unreachable_state,
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_client_form_collects_repeated_companies() {
        let values = ClientFormValues::from_pairs(pairs(&[
            ("email", " compta@cabinet.fr "),
            ("name", "Cabinet Durand"),
            ("glpi_id", "118"),
            ("role", "client"),
            ("phone", "0478000000"),
            ("companies", "c1"),
            ("companies", "c2"),
            ("selected_company", "c2"),
            ("password", ""),
        ]));
        let input = values.to_input();
        assert_eq!(input.email, "compta@cabinet.fr");
        assert_eq!(input.companies, vec![CompanyId::new("c1"), CompanyId::new("c2")]);
        assert_eq!(input.selected_company, Some(CompanyId::new("c2")));
        assert_eq!(input.password, None);
        assert_eq!(input.specs.client.phone, "0478000000");
        assert!(input.validate(false).is_ok());
        assert!(input.validate(true).is_err());
    }

    #[test]
    fn test_staff_accounts_carry_no_contact_details() {
        let values = ClientFormValues::from_pairs(pairs(&[
            ("role", "moderator"),
            ("phone", "0478000000"),
        ]));
        assert_eq!(values.to_input().specs, AccountSpecs::default());
    }

    #[test]
    fn test_company_form_tier() {
        let form = CompanyForm {
            glpi_id: "31".into(),
            name: "Pharmacie Centrale".into(),
            tier: "taux2".into(),
        };
        assert_eq!(form.to_input().tier, Some(Tier::Tier2));
        let untagged = CompanyForm {
            tier: String::new(),
            ..form
        };
        assert_eq!(untagged.to_input().tier, None);
    }

    #[tokio::test]
    async fn test_moderator_is_kept_out() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("moderator", None))).await;
        let response = get(&app, "/admin", Some(&cookie)).await;
        assert_eq!(location(&response), Some("/dashboard"));
    }

    #[tokio::test]
    async fn test_admin_sees_load_failures() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("admin", None))).await;
        let response = get(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Impossible de charger les clients"));
        assert!(body.contains("Impossible de charger les entreprises"));
    }

    #[tokio::test]
    async fn test_invalid_client_is_not_sent() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("admin", None))).await;
        let response = post_form(
            &app,
            "/new-client",
            Some(&cookie),
            "email=pas-un-email&name=&glpi_id=7&role=user",
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(response).await;
        assert!(body.contains("Email invalide"));
        assert!(body.contains("Mot de passe requis"));
        assert!(body.contains("Nom requis"));
    }

    #[tokio::test]
    async fn test_company_without_name_is_refused() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("admin", None))).await;
        let response = post_form(&app, "/admin/companies", Some(&cookie), "glpi_id=31&name=&tier=").await;
        assert_eq!(location(&response), Some("/admin?tab=companies"));
    }
}
