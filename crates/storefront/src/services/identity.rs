//! The signed-in identity, cached in the session and revalidated on demand.

use std::time::Duration;

use imp360_core::access::{IdentityState, SessionEvent, SessionPhase};
use imp360_core::{CompanyId, Identity};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::backend_session;
use crate::backend::{BackendClient, BackendSession};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::models::{CachedIdentity, session_keys};
use crate::state::AppState;

/// Read model of the signed-in identity for one browser session.
///
/// `GET /me` is only called when no identity is cached or the cached one is
/// older than the revalidation interval.
#[derive(Clone)]
pub struct IdentityStore {
    session: Session,
    backend: BackendClient,
    revalidate: Duration,
}

impl IdentityStore {
    #[must_use]
    pub fn new(session: Session, state: &AppState) -> Self {
        Self {
            session,
            backend: state.backend().clone(),
            revalidate: state.config().identity_revalidate,
        }
    }

    /// The backend session of this browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn backend_session(&self) -> Result<BackendSession> {
        Ok(backend_session(&self.session).await?)
    }

    /// The current identity, revalidated when stale.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails. Backend failures count
    /// as signed out for this request.
    pub async fn current(&self) -> Result<Option<Identity>> {
        if self.backend_session().await?.is_anonymous() {
            return Ok(None);
        }
        if let Some(cached) = self.cached().await?
            && !cached.is_stale(self.revalidate)
        {
            return Ok(Some(cached.identity));
        }
        self.refresh().await
    }

    /// The identity as seen by the route gates.
    pub async fn state(&self) -> IdentityState {
        match self.current().await {
            Ok(identity) => IdentityState::from(identity),
            Err(e) => {
                warn!(error = %e, "Identity unavailable, treating viewer as anonymous");
                IdentityState::Anonymous
            }
        }
    }

    /// Fetch the identity from the backend and replace the cached one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<Identity>> {
        let backend = self.backend_session().await?;
        match self.backend.me(&backend).await {
            Ok(identity) => {
                self.apply(SessionEvent::Refreshed(identity.clone())).await?;
                Ok(identity)
            }
            Err(e) => {
                // Keep the session: the next request tries again.
                warn!(error = %e, "Identity check failed");
                Ok(None)
            }
        }
    }

    /// Sign in with the backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Backend` carrying the backend's message on bad
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let (backend, identity) = self.backend.login(email, password).await?;

        self.session.cycle_id().await?;
        if let Some(cookie) = backend.cookie() {
            self.session
                .insert(session_keys::BACKEND_COOKIE, cookie.to_owned())
                .await?;
        }
        self.session.remove::<u32>(session_keys::CART_COUNT).await?;
        self.apply(SessionEvent::SignedIn(identity.clone())).await?;

        Ok(identity)
    }

    /// Sign out of the backend and destroy the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be flushed.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        let backend = self.backend_session().await?;
        if !backend.is_anonymous()
            && let Err(e) = self.backend.logout(&backend).await
        {
            warn!(error = %e, "Backend logout failed");
        }
        self.apply(SessionEvent::SignedOut).await?;
        self.session.flush().await?;
        Ok(())
    }

    /// Select the company to order for; the backend's answer replaces the
    /// cached identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the selection.
    #[instrument(skip(self))]
    pub async fn select_company(&self, company: &CompanyId) -> Result<Identity> {
        let backend = self.backend_session().await?;
        let identity = self.backend.select_company(&backend, company).await?;
        self.apply(SessionEvent::CompanyChosen(identity.clone())).await?;
        Ok(identity)
    }

    /// Change the account's company from the profile page, then refetch
    /// the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self))]
    pub async fn change_company(&self, company: &CompanyId) -> Result<Option<Identity>> {
        let backend = self.backend_session().await?;
        self.backend.change_company(&backend, company).await?;
        self.refresh().await
    }

    async fn cached(&self) -> Result<Option<CachedIdentity>> {
        match self.session.get::<CachedIdentity>(session_keys::IDENTITY).await {
            Ok(cached) => Ok(cached),
            // An entry written by an older build: drop it and refetch.
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                warn!(error = %e, "Discarding unreadable cached identity");
                self.session.remove_value(session_keys::IDENTITY).await?;
                Ok(None)
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    /// Record a session event, keeping the cached identity and the Sentry
    /// user in step.
    async fn apply(&self, event: SessionEvent) -> Result<()> {
        let before = SessionPhase::of(self.cached().await?.as_ref().map(|c| &c.identity));
        let after = before.after(&event);
        if before != after {
            info!(from = ?before, to = ?after, "Session phase changed");
        }

        match event {
            SessionEvent::SignedIn(identity)
            | SessionEvent::CompanyChosen(identity)
            | SessionEvent::Refreshed(Some(identity)) => {
                set_sentry_user(&identity.id, Some(identity.email.as_str()));
                self.session
                    .insert(session_keys::IDENTITY, CachedIdentity::fresh(identity))
                    .await?;
            }
            SessionEvent::Refreshed(None) => {
                // The backend session expired.
                clear_sentry_user();
                self.session.remove_value(session_keys::IDENTITY).await?;
                self.session.remove_value(session_keys::BACKEND_COOKIE).await?;
                self.session.remove_value(session_keys::CART_COUNT).await?;
            }
            SessionEvent::SignedOut => {
                clear_sentry_user();
                self.session.remove_value(session_keys::IDENTITY).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{identity_json, seeded_session, unreachable_state};

    #[tokio::test]
    async fn test_anonymous_without_backend_cookie() {
        let state = unreachable_state();
        let store = IdentityStore::new(seeded_session(None).await, &state);
        assert_eq!(store.current().await.unwrap(), None);
        assert_eq!(store.state().await, IdentityState::Anonymous);
    }

    #[tokio::test]
    async fn test_fresh_cached_identity_skips_backend() {
        let state = unreachable_state();
        let identity: Identity = serde_json::from_value(identity_json("client", Some("c1"))).unwrap();
        let store = IdentityStore::new(seeded_session(Some(&identity)).await, &state);

        let current = store.current().await.unwrap().unwrap();
        assert_eq!(current.email.as_str(), "acheteur@clinique.fr");
        assert!(current.selected_company.is_some());
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_session() {
        let mut state_config = unreachable_state().config().clone();
        state_config.identity_revalidate = Duration::ZERO;
        let state = AppState::new(state_config).unwrap();
        let identity: Identity = serde_json::from_value(identity_json("user", None)).unwrap();
        let session = seeded_session(Some(&identity)).await;
        let store = IdentityStore::new(session.clone(), &state);

        assert_eq!(store.current().await.unwrap(), None);
        // The cookie survives so the next request can retry.
        assert!(!store.backend_session().await.unwrap().is_anonymous());
    }
}
