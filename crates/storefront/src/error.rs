//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Handlers that cannot turn a failure into a
//! flash notification return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use imp360_core::cart::CartError;
use imp360_core::ticket::TicketError;

use crate::backend::BackendError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Cart quantity rule violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order ticket could not be assembled.
    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(BackendError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) | Self::Cart(_) | Self::Ticket(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::NotFound(_) | Self::Backend(BackendError::NotFound(_)) => {
                "Page introuvable".to_string()
            }
            Self::Backend(BackendError::Unauthenticated) => "Veuillez vous connecter".to_string(),
            Self::Backend(_) => "Le service est momentanément indisponible".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Cart(_) => "La quantité doit être au moins 1".to_string(),
            Self::Ticket(TicketError::EmptyCart) => "Votre panier est vide".to_string(),
            Self::Ticket(TicketError::InvalidContact(_)) => {
                "Veuillez remplir tous les champs obligatoires correctement.".to_string()
            }
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                "Erreur interne du serveur".to_string()
            }
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "65f0c2")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("produit 65f0c2".to_string());
        assert_eq!(err.to_string(), "Not found: produit 65f0c2");

        let err = AppError::Backend(BackendError::Parse("missing field".to_string()));
        assert_eq!(err.to_string(), "Backend error: Parse error: missing field");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::NotFound("p1".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Unauthenticated)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::Api {
                status: 500,
                message: "boom".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
