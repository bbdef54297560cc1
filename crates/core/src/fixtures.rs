//! Builders shared by the unit tests.

#![allow(clippy::unwrap_used)]

use crate::types::{
    Cart, CartLine, Company, CompanyId, Email, Identity, Price, Product, ProductId,
    ProductPrices, Role, Specs, Tier, UserId,
};

pub fn product(public: u32, t1: u32, t2: u32, t3: u32) -> Product {
    Product {
        id: ProductId::new("p1"),
        name: "Latitude 5440".into(),
        sku: "5440".into(),
        brand: "DELL".into(),
        kind: "PC PORTABLE".into(),
        model: String::new(),
        description: String::new(),
        description2: None,
        prices: ProductPrices {
            public: Price::from_euros(public),
            tier1: Price::from_euros(t1),
            tier2: Price::from_euros(t2),
            tier3: Price::from_euros(t3),
        },
        guarantee: None,
        national_range: false,
        image: String::new(),
        category: None,
        specs: Specs::new(),
    }
}

pub fn company(id: &str, tier: Option<Tier>) -> Company {
    Company {
        id: CompanyId::new(id),
        glpi_id: String::new(),
        name: format!("Société {id}"),
        tier,
        created_at: None,
    }
}

/// An identity whose first company, tagged with `selected`, is selected.
pub fn identity(role: Role, selected: Option<Tier>) -> Identity {
    let companies = vec![company("c1", selected), company("c2", Some(Tier::Tier3))];
    Identity {
        id: UserId::new("u1"),
        email: Email::parse("acheteur@clinique.fr").unwrap(),
        name: Some("Jeanne Martin".into()),
        role,
        glpi_id: String::new(),
        selected_company: companies.first().cloned(),
        companies,
        company: Some("Clinique du Parc".into()),
        phone: Some("0102030405".into()),
    }
}

pub fn without_selection(mut identity: Identity) -> Identity {
    identity.selected_company = None;
    identity
}

pub fn cart(lines: &[(&str, u32, u32)]) -> Cart {
    Cart {
        lines: lines
            .iter()
            .map(|&(name, quantity, price)| {
                let mut product = product(price, price, price, price);
                product.id = ProductId::new(format!("id-{name}"));
                product.name = name.to_owned();
                CartLine {
                    product,
                    quantity,
                    price: Price::from_euros(price),
                }
            })
            .collect(),
    }
}
