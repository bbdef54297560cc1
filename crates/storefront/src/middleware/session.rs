//! Session middleware configuration and session-scoped extractors.
//!
//! Sessions live in memory: they only carry the backend session cookie and
//! read models that can be fetched again, so a restart simply signs
//! everyone out.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use imp360_core::access::IdentityState;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use super::flash;
use crate::config::StorefrontConfig;
use crate::services::{CartStore, IdentityStore};
use crate::state::AppState;
use crate::views::PageContext;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "imp360_session";

/// Session expiry after inactivity, in seconds (8 hours).
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer<Store>(
    store: Store,
    config: &StorefrontConfig,
) -> SessionManagerLayer<Store>
where
    Store: SessionStore,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// The session layer is missing from the router.
#[derive(Debug, Clone, Copy)]
pub struct MissingSession;

impl IntoResponse for MissingSession {
    fn into_response(self) -> Response {
        tracing::error!("Session not found in request extensions - session layer misconfigured");
        (StatusCode::INTERNAL_SERVER_ERROR, "Erreur interne du serveur").into_response()
    }
}

fn session(parts: &Parts) -> Result<Session, MissingSession> {
    parts.extensions.get::<Session>().cloned().ok_or(MissingSession)
}

/// Identity of the viewer, resolved once per request and shared by every
/// extractor that needs it.
#[derive(Clone)]
struct ResolvedIdentity(IdentityState);

pub(crate) async fn resolve_identity<S>(
    parts: &mut Parts,
    state: &S,
) -> Result<IdentityState, MissingSession>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    if let Some(ResolvedIdentity(resolved)) = parts.extensions.get::<ResolvedIdentity>() {
        return Ok(resolved.clone());
    }
    let store = IdentityStore::from_request_parts(parts, state).await?;
    let resolved = store.state().await;
    parts.extensions.insert(ResolvedIdentity(resolved.clone()));
    Ok(resolved)
}

impl<S> FromRequestParts<S> for IdentityStore
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(session(parts)?, &AppState::from_ref(state)))
    }
}

impl<S> FromRequestParts<S> for CartStore
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(session(parts)?, &AppState::from_ref(state)))
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let viewer = resolve_identity(parts, state).await?.identity().cloned();
        let cart_count = CartStore::from_request_parts(parts, state)
            .await?
            .count()
            .await;
        let flashes = flash::take(&session(parts)?).await;
        let app = AppState::from_ref(state);

        Ok(Self {
            viewer,
            cart_count,
            flashes,
            search_debounce_ms: app.config().search_debounce.as_millis(),
        })
    }
}
