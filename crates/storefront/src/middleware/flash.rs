//! One-shot notifications carried across a redirect.
//!
//! Handlers queue a message before redirecting; the next rendered page
//! takes the queue out of the session and shows each message once.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use tower_sessions::Session;
use tracing::warn;

use super::session::MissingSession;
use crate::models::{FlashMessage, session_keys};

/// Append a message to the session's queue.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn push(
    session: &Session,
    message: FlashMessage,
) -> Result<(), tower_sessions::session::Error> {
    let mut queue = session
        .get::<Vec<FlashMessage>>(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    queue.push(message);
    session.insert(session_keys::FLASH, queue).await
}

/// Remove and return every queued message.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(session_keys::FLASH).await {
        Ok(queue) => queue.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Dropping unreadable notifications");
            Vec::new()
        }
    }
}

/// Extractor for queueing notifications from a handler.
///
/// A notification that cannot be stored is logged and dropped; it never
/// fails the request.
#[derive(Clone)]
pub struct Flash(Session);

impl Flash {
    pub async fn success(&self, message: impl Into<String>) {
        self.send(FlashMessage::success(message)).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.send(FlashMessage::error(message)).await;
    }

    async fn send(&self, message: FlashMessage) {
        if let Err(e) = push(&self.0, message).await {
            warn!(error = %e, "Failed to queue notification");
        }
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or(MissingSession)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::seeded_session;

    #[tokio::test]
    async fn test_messages_are_shown_once_in_order() {
        let session = seeded_session(None).await;
        push(&session, FlashMessage::success("Client créé avec succès"))
            .await
            .unwrap();
        push(&session, FlashMessage::error("Impossible de charger les entreprises"))
            .await
            .unwrap();

        let shown = take(&session).await;
        assert_eq!(shown.len(), 2);
        assert!(!shown.first().unwrap().is_error());
        assert!(shown.last().unwrap().is_error());
        assert!(take(&session).await.is_empty());
    }
}
