//! Order tickets sent to GLPI.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Where the ordered products are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    /// Shipped to the client.
    #[default]
    Client,
    /// Shipped to the technician.
    Technician,
    /// Shipped to IMP360.
    Imp360,
}

impl DeliveryType {
    pub const ALL: [Self; 3] = [Self::Client, Self::Technician, Self::Imp360];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Technician => "technician",
            Self::Imp360 => "imp360",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "Envoi chez le client",
            Self::Technician => "Envoi chez le technicien",
            Self::Imp360 => "Envoi chez IMP360",
        }
    }
}

/// One ordered product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketItem {
    pub name: String,
    pub quantity: u32,
    pub price: Price,
}

/// Body of `POST /ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub title: String,
    pub items: Vec<TicketItem>,
    pub total: Price,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let request = TicketRequest {
            title: "Commande de produits".into(),
            items: vec![TicketItem {
                name: "Souris".into(),
                quantity: 2,
                price: Price::from_euros(12),
            }],
            total: Price::from_euros(24),
            delivery_type: DeliveryType::Technician,
            company: None,
            client_name: "Jeanne".into(),
            client_phone: "0600000000".into(),
            client_email: "jeanne@clinique.fr".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["deliveryType"], "technician");
        assert_eq!(json["clientEmail"], "jeanne@clinique.fr");
        assert!(json.get("company").is_none());
        assert_eq!(json["items"][0]["quantity"], 2);
    }
}
