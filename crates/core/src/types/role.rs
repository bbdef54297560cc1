//! Account roles.

use serde::{Deserialize, Serialize};

/// Classification of an account, governing route reachability and price
/// visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standard account attached to one or more companies.
    User,
    /// Client contact, orders on behalf of its own company.
    Client,
    /// Internal staff managing the catalogue.
    Moderator,
    /// Full access, including clients and companies.
    Admin,
}

impl Role {
    /// Every role, in ascending order of privilege.
    pub const ALL: [Self; 4] = [Self::User, Self::Client, Self::Moderator, Self::Admin];

    /// Roles allowed into the product back-office.
    pub const STAFF: &'static [Self] = &[Self::Moderator, Self::Admin];

    /// Roles allowed into the clients and companies back-office.
    pub const ADMIN_ONLY: &'static [Self] = &[Self::Admin];

    /// Roles that must pick a company before transacting.
    pub const COMPANY_SCOPED: &'static [Self] = &[Self::User, Self::Client];

    /// Whether this role sees the staff inspection view of prices.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    /// Whether this role must select a company before reaching protected content.
    #[must_use]
    pub const fn requires_company_selection(self) -> bool {
        matches!(self, Self::User | Self::Client)
    }

    /// Wire value used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Client => "client",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Label shown in the back-office.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "Utilisateur",
            Self::Client => "Client",
            Self::Moderator => "Modérateur",
            Self::Admin => "Administrateur",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "client" => Ok(Self::Client),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
