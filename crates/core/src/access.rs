//! Route reachability.
//!
//! Two rules decide whether a viewer reaches a screen:
//!
//! - The role gate compares the viewer's role with a route's allow-list.
//!   Anonymous viewers are sent to sign in; signed-in viewers with the wrong
//!   role are silently sent to the landing page.
//! - The company selection requirement sends users and clients without a
//!   selected company to the company selection step before company-scoped
//!   content. Moderators and administrators bypass it.
//!
//! These rules only decide what the storefront renders. The backend
//! authorizes every write on its own.

use crate::types::{Identity, Role};

/// Where a denied viewer is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The sign-in page.
    SignIn,
    /// The default landing page.
    Landing,
    /// The company selection step.
    CompanySelection,
}

impl Destination {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/login",
            Self::Landing => "/dashboard",
            Self::CompanySelection => "/select-company",
        }
    }
}

/// Outcome of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(Destination),
}

/// What is known about the viewer when a route is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    /// The identity check is still in flight.
    Resolving,
    /// No one is signed in.
    Anonymous,
    Authenticated(Identity),
}

impl IdentityState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Resolving | Self::Anonymous => None,
        }
    }
}

impl From<Option<Identity>> for IdentityState {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Anonymous, Self::Authenticated)
    }
}

/// Decide whether a viewer may reach a route restricted to `allowed`.
///
/// Returns `None` while the identity is still resolving.
#[must_use]
pub fn role_gate(state: &IdentityState, allowed: &[Role]) -> Option<GateDecision> {
    match state {
        IdentityState::Resolving => None,
        IdentityState::Anonymous => Some(GateDecision::Redirect(Destination::SignIn)),
        IdentityState::Authenticated(identity) if allowed.contains(&identity.role) => {
            Some(GateDecision::Allow)
        }
        IdentityState::Authenticated(_) => Some(GateDecision::Redirect(Destination::Landing)),
    }
}

/// Whether an identity must pick a company first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyRequirement {
    Satisfied,
    SelectionRequired,
}

#[must_use]
pub const fn company_requirement(identity: &Identity) -> CompanyRequirement {
    if identity.role.requires_company_selection() && identity.selected_company.is_none() {
        CompanyRequirement::SelectionRequired
    } else {
        CompanyRequirement::Satisfied
    }
}

/// Per-session progress through sign-in and company selection.
///
/// Moderators and administrators are never asked for a company and go
/// straight to [`SessionPhase::CompanySelected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Unauthenticated,
    AwaitingCompany,
    CompanySelected,
}

/// Something that changes the session's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    /// The backend answered a company selection with this identity.
    CompanyChosen(Identity),
    /// The identity was fetched again; `None` if the session has expired.
    Refreshed(Option<Identity>),
    SignedOut,
}

impl SessionPhase {
    #[must_use]
    pub const fn of(identity: Option<&Identity>) -> Self {
        match identity {
            None => Self::Unauthenticated,
            Some(identity) => match company_requirement(identity) {
                CompanyRequirement::SelectionRequired => Self::AwaitingCompany,
                CompanyRequirement::Satisfied => Self::CompanySelected,
            },
        }
    }

    /// Phase after `event`.
    ///
    /// A refresh may move a session back to `AwaitingCompany` when the backend
    /// cleared the selection, e.g. after the company was deleted.
    #[must_use]
    pub const fn after(self, event: &SessionEvent) -> Self {
        match (self, event) {
            (_, SessionEvent::SignedOut | SessionEvent::Refreshed(None)) => Self::Unauthenticated,
            (_, SessionEvent::SignedIn(identity) | SessionEvent::Refreshed(Some(identity))) => {
                Self::of(Some(identity))
            }
            (Self::Unauthenticated, SessionEvent::CompanyChosen(_)) => Self::Unauthenticated,
            (_, SessionEvent::CompanyChosen(identity)) => Self::of(Some(identity)),
        }
    }
}

/// Who may reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    Public,
    /// Any signed-in role.
    Authenticated,
    /// Any signed-in role, after the company selection step.
    CompanyScoped,
    Roles(&'static [Role]),
}

impl RoutePolicy {
    /// Evaluate the policy for a viewer. `None` while the identity resolves.
    #[must_use]
    pub fn evaluate(self, state: &IdentityState) -> Option<GateDecision> {
        match self {
            Self::Public => Some(GateDecision::Allow),
            Self::Authenticated => role_gate(state, &Role::ALL),
            Self::Roles(allowed) => role_gate(state, allowed),
            Self::CompanyScoped => match role_gate(state, &Role::ALL)? {
                GateDecision::Allow => {
                    let identity = state.identity()?;
                    Some(match company_requirement(identity) {
                        CompanyRequirement::Satisfied => GateDecision::Allow,
                        CompanyRequirement::SelectionRequired => {
                            GateDecision::Redirect(Destination::CompanySelection)
                        }
                    })
                }
                redirect @ GateDecision::Redirect(_) => Some(redirect),
            },
        }
    }
}

/// Screens of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRoute {
    Login,
    SelectCompany,
    Dashboard,
    Category,
    ProductDetails,
    Cart,
    Profile,
    Intern,
    NewProduct,
    ModifyProduct,
    Admin,
    NewClient,
    ModifyClient,
    LegalNotice,
    PrivacyPolicy,
}

impl AppRoute {
    pub const ALL: [Self; 15] = [
        Self::Login,
        Self::SelectCompany,
        Self::Dashboard,
        Self::Category,
        Self::ProductDetails,
        Self::Cart,
        Self::Profile,
        Self::Intern,
        Self::NewProduct,
        Self::ModifyProduct,
        Self::Admin,
        Self::NewClient,
        Self::ModifyClient,
        Self::LegalNotice,
        Self::PrivacyPolicy,
    ];

    /// Path pattern, in axum syntax.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::SelectCompany => "/select-company",
            Self::Dashboard => "/dashboard",
            Self::Category => "/categorie/{category}",
            Self::ProductDetails => "/product/{id}",
            Self::Cart => "/cart",
            Self::Profile => "/profile",
            Self::Intern => "/intern",
            Self::NewProduct => "/new-product",
            Self::ModifyProduct => "/modify-product/{id}",
            Self::Admin => "/admin",
            Self::NewClient => "/new-client",
            Self::ModifyClient => "/modify-client/{id}",
            Self::LegalNotice => "/mentionlegales",
            Self::PrivacyPolicy => "/politiqueconfidentialite",
        }
    }

    #[must_use]
    pub const fn policy(self) -> RoutePolicy {
        match self {
            Self::Login
            | Self::Category
            | Self::ProductDetails
            | Self::Cart
            | Self::LegalNotice
            | Self::PrivacyPolicy => RoutePolicy::Public,
            Self::SelectCompany => RoutePolicy::Roles(Role::COMPANY_SCOPED),
            Self::Dashboard => RoutePolicy::CompanyScoped,
            Self::Profile => RoutePolicy::Authenticated,
            Self::Intern | Self::NewProduct | Self::ModifyProduct => RoutePolicy::Roles(Role::STAFF),
            Self::Admin | Self::NewClient | Self::ModifyClient => {
                RoutePolicy::Roles(Role::ADMIN_ONLY)
            }
        }
    }
}

/// Where unknown paths and a completed sign-in lead.
#[must_use]
pub const fn landing_route(identity: Option<&Identity>) -> Destination {
    match SessionPhase::of(identity) {
        SessionPhase::Unauthenticated => Destination::SignIn,
        SessionPhase::AwaitingCompany => Destination::CompanySelection,
        SessionPhase::CompanySelected => Destination::Landing,
    }
}
