//! Session-related types.
//!
//! Types stored in the session between requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use imp360_core::Identity;

/// The last identity fetched from `GET /me`, with the time it was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub identity: Identity,
    pub fetched_at: DateTime<Utc>,
}

impl CachedIdentity {
    #[must_use]
    pub fn fresh(identity: Identity) -> Self {
        Self {
            identity,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the entry is older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: std::time::Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.to_std().is_ok_and(|age| age >= max_age)
    }
}

/// Tone of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A notification shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub title: String,
    pub message: String,
}

impl FlashMessage {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            title: "Succès".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            title: "Erreur".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }
}

/// Session keys.
pub mod keys {
    /// `Cookie` header value of the backend session.
    pub const BACKEND_COOKIE: &str = "backend_cookie";

    /// Last identity fetched from the backend.
    pub const IDENTITY: &str = "identity";

    /// Number of units in the cart, shown on the badge.
    pub const CART_COUNT: &str = "cart_count";

    /// Pending notifications.
    pub const FLASH: &str = "flash";

    /// Key of this session's search generation counter.
    pub const SEARCH_KEY: &str = "search_key";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flash_constructors() {
        let ok = FlashMessage::success("Entreprise sélectionnée avec succès");
        assert_eq!(ok.title, "Succès");
        assert!(!ok.is_error());
        assert!(FlashMessage::error("Impossible de charger les entreprises").is_error());
    }

    #[test]
    fn test_future_timestamp_is_not_stale() {
        let json = r#"{
            "identity": {"_id": "u1", "email": "a@b.fr", "role": "admin"},
            "fetched_at": "2999-01-01T00:00:00Z"
        }"#;
        let cached: CachedIdentity = serde_json::from_str(json).unwrap();
        assert!(!cached.is_stale(Duration::from_secs(60)));

        let mut old = cached;
        old.fetched_at = Utc::now() - chrono::Duration::seconds(120);
        assert!(old.is_stale(Duration::from_secs(60)));
        assert!(!old.is_stale(Duration::from_secs(600)));
    }
}
