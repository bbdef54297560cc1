//! Order ticket assembly.
//!
//! Turns the cart and the delivery form into the ticket sent to GLPI. Client
//! accounts order for themselves: delivery goes to the client and the contact
//! details come from the account, so the form is not validated. Every other
//! viewer must fill in a contact name, phone and email.

use crate::types::{Cart, DeliveryType, Email, Identity, Role, TicketItem, TicketRequest};

/// Title of every order ticket.
pub const TICKET_TITLE: &str = "Commande de produits";

/// Item name used when a product has none.
pub const UNNAMED_PRODUCT: &str = "Produit sans nom";

/// Per-field validation messages of the contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactErrors {
    pub client_name: Option<&'static str>,
    pub client_phone: Option<&'static str>,
    pub client_email: Option<&'static str>,
}

impl ContactErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.client_name.is_none() && self.client_phone.is_none() && self.client_email.is_none()
    }
}

/// Errors preventing a ticket from being created.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("the cart is empty")]
    EmptyCart,
    #[error("contact details are incomplete")]
    InvalidContact(ContactErrors),
}

/// Contact details typed in the delivery form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub client_name: String,
    pub client_phone: String,
    pub client_email: String,
}

impl ContactForm {
    /// Validate every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the messages of the fields that are missing or malformed.
    pub fn validate(&self) -> Result<(), ContactErrors> {
        let mut errors = ContactErrors::default();
        if self.client_name.trim().is_empty() {
            errors.client_name = Some("Le nom est requis");
        }
        if self.client_phone.trim().is_empty() {
            errors.client_phone = Some("Le numéro de téléphone est requis");
        }
        let email = self.client_email.trim();
        if email.is_empty() {
            errors.client_email = Some("L'email est requis");
        } else if Email::parse(email).is_err() {
            errors.client_email = Some("Format d'email invalide");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// The delivery form as submitted from the cart page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketDraft {
    pub contact: ContactForm,
    pub delivery: DeliveryType,
    /// Company typed by a moderator ordering for a client.
    pub company: Option<String>,
}

impl TicketDraft {
    /// Assemble the ticket for `cart` on behalf of `viewer`.
    ///
    /// # Errors
    ///
    /// Fails on an empty cart, or when a non-client viewer's contact details
    /// do not validate.
    pub fn build(&self, viewer: Option<&Identity>, cart: &Cart) -> Result<TicketRequest, TicketError> {
        if cart.is_empty() {
            return Err(TicketError::EmptyCart);
        }

        let items = cart
            .lines
            .iter()
            .map(|line| TicketItem {
                name: line.product.display_name().to_owned(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();
        let total = cart.total();

        if let Some(client) = viewer.filter(|i| i.role == Role::Client) {
            return Ok(TicketRequest {
                title: TICKET_TITLE.to_owned(),
                items,
                total,
                delivery_type: DeliveryType::Client,
                company: account_company(client),
                client_name: client.name.clone().unwrap_or_default(),
                client_phone: client.phone.clone().unwrap_or_default(),
                client_email: client.email.to_string(),
            });
        }

        self.contact.validate().map_err(TicketError::InvalidContact)?;

        let company = match viewer {
            Some(moderator) if moderator.role == Role::Moderator => self
                .company
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
            Some(identity) => account_company(identity),
            None => None,
        };

        Ok(TicketRequest {
            title: TICKET_TITLE.to_owned(),
            items,
            total,
            delivery_type: self.delivery,
            company,
            client_name: self.contact.client_name.trim().to_owned(),
            client_phone: self.contact.client_phone.trim().to_owned(),
            client_email: self.contact.client_email.trim().to_owned(),
        })
    }
}

/// The account's own company name, or the selected company's.
fn account_company(identity: &Identity) -> Option<String> {
    identity.company.clone().or_else(|| {
        identity
            .selected_company
            .as_ref()
            .map(|c| c.name.clone())
            .filter(|n| !n.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::{cart, identity};
    use crate::types::{Price, Tier};

    fn filled_form() -> TicketDraft {
        TicketDraft {
            contact: ContactForm {
                client_name: " Dr Léa Bernard ".into(),
                client_phone: "0611223344".into(),
                client_email: "lea.bernard@cabinet.fr".into(),
            },
            delivery: DeliveryType::Technician,
            company: Some("Cabinet Bernard".into()),
        }
    }

    #[test]
    fn test_items_and_total() {
        let ticket = filled_form()
            .build(
                Some(&identity(Role::User, Some(Tier::Tier1))),
                &cart(&[("Souris", 3, 12), ("", 1, 200)]),
            )
            .unwrap();
        assert_eq!(ticket.title, TICKET_TITLE);
        assert_eq!(ticket.items.len(), 2);
        assert_eq!(ticket.items[1].name, UNNAMED_PRODUCT);
        assert_eq!(ticket.total, Price::from_euros(236));
        assert_eq!(ticket.client_name, "Dr Léa Bernard");
        assert_eq!(ticket.delivery_type, DeliveryType::Technician);
        assert_eq!(ticket.company.as_deref(), Some("Clinique du Parc"));
    }

    #[test]
    fn test_client_orders_for_itself_without_form() {
        let client = identity(Role::Client, Some(Tier::Tier2));
        let ticket = TicketDraft::default()
            .build(Some(&client), &cart(&[("Écran", 1, 150)]))
            .unwrap();
        assert_eq!(ticket.delivery_type, DeliveryType::Client);
        assert_eq!(ticket.client_name, "Jeanne Martin");
        assert_eq!(ticket.client_email, "acheteur@clinique.fr");
        assert_eq!(ticket.client_phone, "0102030405");
    }

    #[test]
    fn test_moderator_supplies_company() {
        let ticket = filled_form()
            .build(
                Some(&identity(Role::Moderator, None)),
                &cart(&[("Switch", 1, 90)]),
            )
            .unwrap();
        assert_eq!(ticket.company.as_deref(), Some("Cabinet Bernard"));
    }

    #[test]
    fn test_validation_messages() {
        let draft = TicketDraft {
            contact: ContactForm {
                client_name: "  ".into(),
                client_phone: String::new(),
                client_email: "pas-un-email".into(),
            },
            ..TicketDraft::default()
        };
        let err = draft
            .build(Some(&identity(Role::Admin, None)), &cart(&[("Câble", 1, 5)]))
            .unwrap_err();
        assert_eq!(
            err,
            TicketError::InvalidContact(ContactErrors {
                client_name: Some("Le nom est requis"),
                client_phone: Some("Le numéro de téléphone est requis"),
                client_email: Some("Format d'email invalide"),
            })
        );

        let missing = ContactForm::default().validate().unwrap_err();
        assert_eq!(missing.client_email, Some("L'email est requis"));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            filled_form().build(None, &cart(&[])),
            Err(TicketError::EmptyCart)
        );
    }
}
