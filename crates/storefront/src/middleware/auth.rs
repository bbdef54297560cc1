//! Route gates as extractors.
//!
//! Each extractor evaluates a [`RoutePolicy`] against the viewer's identity
//! before the handler runs. A denied viewer is redirected: to `/login` when
//! nobody is signed in, to the company selection step when a company is
//! still missing, and silently to the dashboard when the role is not allowed.
//!
//! These gates only decide what the storefront renders. The backend
//! authorizes every write on its own.

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use imp360_core::access::{Destination, GateDecision, IdentityState, RoutePolicy};
use imp360_core::{Identity, Role};
use tracing::debug;

use super::session::{MissingSession, resolve_identity};
use crate::state::AppState;

/// Request header set by htmx on every request it issues.
pub const HX_REQUEST: &str = "hx-request";

/// Response header telling htmx to perform a full navigation.
pub const HX_REDIRECT: &str = "hx-redirect";

/// Whether the request comes from htmx rather than a full page load.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Redirect that also works for htmx requests, which would otherwise swap
/// the target page into the current fragment.
#[must_use]
pub fn navigate(to: &str, htmx: bool) -> Response {
    if htmx {
        match HeaderValue::from_str(to) {
            Ok(value) => (StatusCode::OK, [(HX_REDIRECT, value)]).into_response(),
            Err(_) => Redirect::to("/").into_response(),
        }
    } else {
        Redirect::to(to).into_response()
    }
}

/// Why a gate turned the request away.
#[derive(Debug)]
pub enum GateRejection {
    Redirect { to: Destination, htmx: bool },
    Session(MissingSession),
}

impl From<MissingSession> for GateRejection {
    fn from(missing: MissingSession) -> Self {
        Self::Session(missing)
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { to, htmx } => navigate(to.path(), htmx),
            Self::Session(missing) => missing.into_response(),
        }
    }
}

async fn admit<S>(parts: &mut Parts, state: &S, policy: RoutePolicy) -> Result<Identity, GateRejection>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    let viewer = resolve_identity(parts, state).await?;
    // The identity is always settled before a handler runs.
    let decision = policy
        .evaluate(&viewer)
        .unwrap_or(GateDecision::Redirect(Destination::SignIn));

    match (decision, viewer) {
        (GateDecision::Allow, IdentityState::Authenticated(identity)) => Ok(identity),
        (GateDecision::Redirect(to), viewer) => {
            debug!(
                path = %parts.uri.path(),
                role = ?viewer.identity().map(|i| i.role),
                destination = to.path(),
                "Gate denied"
            );
            Err(GateRejection::Redirect {
                to,
                htmx: is_htmx(&parts.headers),
            })
        }
        (GateDecision::Allow, _) => Err(GateRejection::Redirect {
            to: Destination::SignIn,
            htmx: is_htmx(&parts.headers),
        }),
    }
}

/// The viewer, signed in or not. Never rejects.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalIdentity(viewer): OptionalIdentity) -> impl IntoResponse {
///     match viewer {
///         Some(identity) => format!("Bonjour, {}", identity.display_name()),
///         None => "Bonjour".to_string(),
///     }
/// }
/// ```
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let viewer = resolve_identity(parts, state).await?;
        Ok(Self(viewer.identity().cloned()))
    }
}

/// Any signed-in viewer; anonymous viewers are sent to `/login`.
pub struct RequireIdentity(pub Identity);

impl<S> FromRequestParts<S> for RequireIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        admit(parts, state, RoutePolicy::Authenticated).await.map(Self)
    }
}

/// A signed-in viewer who has passed the company selection step.
///
/// Users and clients without a selected company are sent to
/// `/select-company`; moderators and administrators always pass.
pub struct RequireCompany(pub Identity);

impl<S> FromRequestParts<S> for RequireCompany
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        admit(parts, state, RoutePolicy::CompanyScoped).await.map(Self)
    }
}

/// Allow-list of roles for [`RequireRole`].
pub trait RolePolicy {
    const ALLOWED: &'static [Role];
}

/// Moderators and administrators.
pub enum Staff {}

impl RolePolicy for Staff {
    const ALLOWED: &'static [Role] = Role::STAFF;
}

/// Administrators only.
pub enum AdminOnly {}

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [Role] = Role::ADMIN_ONLY;
}

/// Users and clients, the roles that order for a company.
pub enum Buyer {}

impl RolePolicy for Buyer {
    const ALLOWED: &'static [Role] = Role::COMPANY_SCOPED;
}

/// A signed-in viewer whose role is in `P::ALLOWED`.
///
/// # Example
///
/// ```rust,ignore
/// async fn back_office(RequireRole { identity, .. }: RequireRole<Staff>) -> impl IntoResponse {
///     identity.role.label()
/// }
/// ```
pub struct RequireRole<P> {
    pub identity: Identity,
    policy: PhantomData<fn() -> P>,
}

impl<P, S> FromRequestParts<S> for RequireRole<P>
where
    P: RolePolicy,
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = admit(parts, state, RoutePolicy::Roles(P::ALLOWED)).await?;
        Ok(Self {
            identity,
            policy: PhantomData,
        })
    }
}
