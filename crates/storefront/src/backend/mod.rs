//! Client for the GLPI-backed REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth: no local persistence, direct API calls
//! - Every request is attempted once, with no retries and the transport's default timeout
//! - The backend authenticates with a session cookie issued by `POST /api/login`;
//!   the storefront keeps that cookie in its own session ([`BackendSession`])
//! - Product reads are cached in memory via `moka` and invalidated on product writes
//!
//! # Example
//!
//! ```rust,ignore
//! use imp360_storefront::backend::{BackendClient, BackendSession};
//!
//! let client = BackendClient::new(&config)?;
//! let (session, identity) = client.login("acheteur@clinique.fr", "secret").await?;
//! let cart = client.add_to_cart(&session, &product.id, price).await?;
//! ```

mod client;

pub use client::{BackendClient, ImageUpload};

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the session cookie.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Message reported by the backend, when it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend reports failures as `{"message": ...}`, `{"error": ...}` or
/// `{"details": ...}`; anything else is passed through as plain text.
fn error_message(body: &str) -> String {
    let body = body.trim();
    if let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "details"] {
            if let Some(Value::String(message)) = doc.get(key) {
                return message.clone();
            }
        }
    }
    body.chars().take(200).collect()
}

/// The caller's authentication with the backend.
///
/// Holds the `Cookie` header value issued at login. Anonymous visitors use
/// [`BackendSession::anonymous`].
#[derive(Clone, Default)]
pub struct BackendSession {
    cookie: Option<SecretString>,
}

impl BackendSession {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { cookie: None }
    }

    #[must_use]
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        let cookie: String = cookie.into();
        if cookie.is_empty() {
            return Self::anonymous();
        }
        Self {
            cookie: Some(SecretString::from(cookie)),
        }
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.cookie.is_none()
    }

    /// The `Cookie` header value to send, if signed in.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_ref().map(|c| c.expose_secret())
    }
}

impl std::fmt::Debug for BackendSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSession")
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message": "Produit introuvable"}"#), "Produit introuvable");
        assert_eq!(error_message(r#"{"error": "GLPI indisponible"}"#), "GLPI indisponible");
        assert_eq!(error_message(r#"{"details": "Session GLPI expirée"}"#), "Session GLPI expirée");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"code": 12}"#), r#"{"code": 12}"#);
    }

    #[test]
    fn test_backend_message() {
        let err = BackendError::Api {
            status: 500,
            message: "Ticket refusé par GLPI".to_string(),
        };
        assert_eq!(err.backend_message(), Some("Ticket refusé par GLPI"));
        assert_eq!(BackendError::Unauthenticated.backend_message(), None);
    }

    #[test]
    fn test_session_debug_redacts_cookie() {
        let session = BackendSession::from_cookie("connect.sid=s%3Aabc123");
        assert!(!session.is_anonymous());
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("abc123"));
        assert!(BackendSession::from_cookie("").is_anonymous());
    }
}
