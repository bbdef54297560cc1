//! Client companies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::CompanyId;
use super::lenient;
use super::tier::Tier;

/// A client company and its pricing tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", alias = "id")]
    pub id: CompanyId,
    /// Reference of the entity in GLPI.
    #[serde(rename = "glpiId", default, deserialize_with = "lenient::string_or_number")]
    pub glpi_id: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub name: String,
    /// Pricing tier; `None` when untagged or unrecognized.
    #[serde(rename = "taux", default, deserialize_with = "Tier::deserialize_lenient")]
    pub tier: Option<Tier>,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "lenient::optional_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Company {
    /// Tier label shown in the back-office.
    #[must_use]
    pub fn tier_label(&self) -> &'static str {
        self.tier.map_or("Non défini", Tier::as_str)
    }
}

/// Body of `POST /companies` and `PUT /companies/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyInput {
    #[serde(rename = "glpiId")]
    pub glpi_id: String,
    pub name: String,
    /// Sent as an empty string when untagged.
    #[serde(rename = "taux", serialize_with = "serialize_tier_tag")]
    pub tier: Option<Tier>,
}

impl CompanyInput {
    /// Name of the first missing required field, as shown to the user.
    ///
    /// # Errors
    ///
    /// Returns the French message for the missing field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("Le nom de l'entreprise est requis");
        }
        if self.glpi_id.trim().is_empty() {
            return Err("L'ID GLPI est requis");
        }
        Ok(())
    }
}

#[allow(clippy::ref_option)]
fn serialize_tier_tag<S>(tier: &Option<Tier>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(tier.map_or("", Tier::as_str))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_document() {
        let company: Company = serde_json::from_str(
            r#"{
                "_id": "65a1",
                "glpiId": 12,
                "name": "Clinique du Parc",
                "taux": "taux2",
                "createdAt": "2024-03-12T09:30:00.000Z",
                "__v": 0
            }"#,
        )
        .unwrap();
        assert_eq!(company.id.as_str(), "65a1");
        assert_eq!(company.glpi_id, "12");
        assert_eq!(company.tier, Some(Tier::Tier2));
        assert!(company.created_at.is_some());
    }

    #[test]
    fn test_unknown_tier_is_untagged() {
        let company: Company =
            serde_json::from_str(r#"{"_id": "1", "name": "X", "taux": "gold"}"#).unwrap();
        assert_eq!(company.tier, None);
        assert_eq!(company.tier_label(), "Non défini");
    }

    #[test]
    fn test_survives_session_round_trip() {
        let company = Company {
            id: CompanyId::new("c1"),
            glpi_id: "7".into(),
            name: "Cabinet Martin".into(),
            tier: Some(Tier::Tier1),
            created_at: None,
        };
        let json = serde_json::to_string(&company).unwrap();
        assert_eq!(serde_json::from_str::<Company>(&json).unwrap(), company);
    }

    #[test]
    fn test_company_input() {
        let input = CompanyInput {
            glpi_id: "31".into(),
            name: "Pharmacie Centrale".into(),
            tier: None,
        };
        assert!(input.validate().is_ok());
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["taux"], "");
        assert_eq!(json["glpiId"], "31");

        let tagged = CompanyInput {
            tier: Some(Tier::Tier3),
            name: " ".into(),
            ..input
        };
        assert_eq!(serde_json::to_value(&tagged).unwrap()["taux"], "taux3");
        assert!(tagged.validate().is_err());
    }
}
