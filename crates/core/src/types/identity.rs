//! The signed-in account as reported by the backend's `/me` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::company::Company;
use super::email::Email;
use super::id::{CompanyId, UserId};
use super::lenient;
use super::role::Role;
use super::tier::Tier;

/// Errors raised when an identity breaks its invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The selected company is not one of the account's companies.
    #[error("selected company {0} is not associated with this account")]
    SelectionNotInCompanies(CompanyId),
}

/// A signed-in account.
///
/// The selected company, when present, is always one of `companies`:
/// selections that violate this are dropped when the identity is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIdentity")]
pub struct Identity {
    pub id: UserId,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(rename = "glpiId")]
    pub glpi_id: String,
    pub companies: Vec<Company>,
    #[serde(rename = "selectedCompany")]
    pub selected_company: Option<Company>,
    /// Free-text company name carried by client accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Identity {
    /// Check the selected-company invariant.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::SelectionNotInCompanies`] if the selection is
    /// not one of the account's companies.
    pub fn validate(&self) -> Result<(), IdentityError> {
        match &self.selected_company {
            Some(selected) if !self.belongs_to(&selected.id) => {
                Err(IdentityError::SelectionNotInCompanies(selected.id.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Whether the account is associated with the given company.
    #[must_use]
    pub fn belongs_to(&self, company: &CompanyId) -> bool {
        self.companies.iter().any(|c| &c.id == company)
    }

    /// Pricing tier of the selected company, if any.
    #[must_use]
    pub fn selected_tier(&self) -> Option<Tier> {
        self.selected_company.as_ref().and_then(|c| c.tier)
    }

    /// Name shown in the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

#[derive(Deserialize)]
struct RawIdentity {
    #[serde(alias = "_id")]
    id: UserId,
    email: Email,
    #[serde(default)]
    name: Option<String>,
    role: Role,
    #[serde(rename = "glpiId", default, deserialize_with = "lenient::string_or_number")]
    glpi_id: String,
    #[serde(default, deserialize_with = "lenient::skip_invalid")]
    companies: Vec<Company>,
    #[serde(rename = "selectedCompany", default)]
    selected_company: Option<Value>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    specs: Option<Value>,
}

impl From<RawIdentity> for Identity {
    fn from(raw: RawIdentity) -> Self {
        // The backend sends either the populated company or its bare id.
        let selected_company = match raw.selected_company {
            Some(Value::String(id)) => raw.companies.iter().find(|c| c.id.as_str() == id).cloned(),
            Some(value @ Value::Object(_)) => serde_json::from_value::<Company>(value).ok(),
            _ => None,
        }
        .filter(|selected| raw.companies.iter().any(|c| c.id == selected.id));

        let phone = raw.phone.or_else(|| {
            raw.specs
                .as_ref()
                .and_then(|s| s.pointer("/client/phone"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });

        Self {
            id: raw.id,
            email: raw.email,
            name: raw.name.filter(|n| !n.is_empty()),
            role: raw.role,
            glpi_id: raw.glpi_id,
            companies: raw.companies,
            selected_company,
            company: raw.company.filter(|c| !c.is_empty()),
            phone: phone.filter(|p| !p.is_empty()),
        }
    }
}

/// Envelope returned by `/me`, `/login` and `/select-company`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEnvelope {
    pub user: Option<Identity>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ME: &str = r#"{
        "id": "u1",
        "email": "compta@clinique.fr",
        "role": "user",
        "glpiId": 31,
        "companies": [
            {"_id": "c1", "glpiId": "4", "name": "Clinique du Parc", "taux": "taux1"},
            {"_id": "c2", "glpiId": "5", "name": "Cabinet Martin", "taux": "taux3"}
        ],
        "selectedCompany": {"_id": "c2", "glpiId": "5", "name": "Cabinet Martin", "taux": "taux3"},
        "specs": {"client": {"phone": "0102030405"}}
    }"#;

    #[test]
    fn test_decodes_me_payload() {
        let identity: Identity = serde_json::from_str(ME).unwrap();
        assert_eq!(identity.role, Role::User);
        assert_eq!(identity.glpi_id, "31");
        assert_eq!(identity.companies.len(), 2);
        assert_eq!(identity.selected_tier(), Some(Tier::Tier3));
        assert_eq!(identity.phone.as_deref(), Some("0102030405"));
        assert_eq!(identity.display_name(), "compta");
        assert!(identity.validate().is_ok());
    }

    #[test]
    fn test_selection_by_bare_id() {
        let json = ME.replace(
            r#""selectedCompany": {"_id": "c2", "glpiId": "5", "name": "Cabinet Martin", "taux": "taux3"}"#,
            r#""selectedCompany": "c1""#,
        );
        let identity: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity.selected_tier(), Some(Tier::Tier1));
    }

    #[test]
    fn test_foreign_selection_is_dropped() {
        let json = ME.replace(r#""selectedCompany": {"_id": "c2""#, r#""selectedCompany": {"_id": "zz""#);
        let identity: Identity = serde_json::from_str(&json).unwrap();
        assert!(identity.selected_company.is_none());
    }

    #[test]
    fn test_validate_reports_foreign_selection() {
        let mut identity: Identity = serde_json::from_str(ME).unwrap();
        identity.companies.retain(|c| c.id.as_str() == "c1");
        assert_eq!(
            identity.validate(),
            Err(IdentityError::SelectionNotInCompanies(CompanyId::new("c2")))
        );
    }

    #[test]
    fn test_unknown_role_fails() {
        let json = ME.replace(r#""role": "user""#, r#""role": "superadmin""#);
        assert!(serde_json::from_str::<Identity>(&json).is_err());
    }

    #[test]
    fn test_survives_session_round_trip() {
        let identity: Identity = serde_json::from_str(ME).unwrap();
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(serde_json::from_str::<Identity>(&json).unwrap(), identity);
    }

    #[test]
    fn test_envelope_without_user() {
        let envelope: IdentityEnvelope = serde_json::from_str(r#"{"user": null}"#).unwrap();
        assert!(envelope.user.is_none());
    }
}
