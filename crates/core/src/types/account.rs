//! Accounts as managed from the administration screens.
//!
//! Unlike [`Identity`](super::Identity), the `/users` endpoints reference
//! companies by id only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::email::Email;
use super::id::{CompanyId, UserId};
use super::lenient;
use super::role::Role;

/// An account row from `GET /users` or `GET /users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAccount")]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub glpi_id: String,
    pub companies: Vec<CompanyId>,
    pub selected_company: Option<CompanyId>,
    pub phone: String,
    pub address: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Whether the account is associated with the given company.
    #[must_use]
    pub fn has_company(&self, company: &CompanyId) -> bool {
        self.companies.contains(company)
    }
}

#[derive(Deserialize)]
struct RawAccount {
    #[serde(rename = "_id", alias = "id")]
    id: UserId,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    email: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    name: String,
    #[serde(default = "default_role")]
    role: Role,
    #[serde(rename = "glpiId", default, deserialize_with = "lenient::string_or_number")]
    glpi_id: String,
    #[serde(default, deserialize_with = "lenient::id_refs")]
    companies: Vec<CompanyId>,
    #[serde(rename = "selectedCompany", default, deserialize_with = "lenient::optional_id_ref")]
    selected_company: Option<CompanyId>,
    #[serde(default)]
    specs: Option<Value>,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient::optional_datetime")]
    created_at: Option<DateTime<Utc>>,
}

const fn default_role() -> Role {
    Role::User
}

impl From<RawAccount> for Account {
    fn from(raw: RawAccount) -> Self {
        let client_field = |field: &str| {
            raw.specs
                .as_ref()
                .and_then(|s| s.get("client"))
                .and_then(|c| c.get(field))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let phone = client_field("phone");
        let address = client_field("address");

        Self {
            id: raw.id,
            email: raw.email,
            name: raw.name,
            role: raw.role,
            glpi_id: raw.glpi_id,
            companies: raw.companies,
            selected_company: raw.selected_company,
            phone,
            address,
            created_at: raw.created_at,
        }
    }
}

/// Per-field validation messages of the account form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
    pub name: Option<&'static str>,
    pub glpi_id: Option<&'static str>,
    pub selected_company: Option<&'static str>,
}

impl AccountErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.name.is_none()
            && self.glpi_id.is_none()
            && self.selected_company.is_none()
    }
}

/// Contact details stored under `specs.client`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientSpecs {
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountSpecs {
    pub client: ClientSpecs,
}

/// Body of `POST /users` and `PUT /users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInput {
    pub email: String,
    /// Omitted on update to keep the current password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
    pub role: Role,
    #[serde(rename = "glpiId")]
    pub glpi_id: String,
    pub companies: Vec<CompanyId>,
    #[serde(rename = "selectedCompany", skip_serializing_if = "Option::is_none")]
    pub selected_company: Option<CompanyId>,
    pub specs: AccountSpecs,
}

impl AccountInput {
    /// Validate the form. A password is only required when `creating`.
    ///
    /// # Errors
    ///
    /// Returns the messages of every invalid field.
    pub fn validate(&self, creating: bool) -> Result<(), AccountErrors> {
        let mut errors = AccountErrors::default();
        if Email::parse(self.email.trim()).is_err() {
            errors.email = Some("Email invalide");
        }
        if creating && self.password.as_deref().is_none_or(str::is_empty) {
            errors.password = Some("Mot de passe requis");
        }
        if self.name.trim().is_empty() {
            errors.name = Some("Nom requis");
        }
        if self.glpi_id.trim().is_empty() {
            errors.glpi_id = Some("ID GLPI requis");
        }
        if let Some(selected) = &self.selected_company
            && !self.companies.contains(selected)
        {
            errors.selected_company =
                Some("L'entreprise par défaut doit faire partie des entreprises du client");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
