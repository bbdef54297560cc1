//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Pages load their own scripts and styles plus htmx from unpkg. Product
//! images are served by the GLPI backend, so its origin is allowed for
//! images and embedding uses `credentialless` instead of `require-corp`.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::state::AppState;

/// Origin allowed to serve the htmx script.
const SCRIPT_CDN: &str = "https://unpkg.com";

/// Build the Content-Security-Policy for a backend at `api_url`.
#[must_use]
pub fn content_security_policy(api_url: &Url) -> String {
    let backend = api_url.origin().ascii_serialization();
    format!(
        "default-src 'none'; \
         script-src 'self' {SCRIPT_CDN}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' data: {backend}; \
         connect-src 'self'; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin`
/// - `Content-Security-Policy` (see [`content_security_policy`])
/// - `Permissions-Policy` denying sensors, camera, microphone and payment
/// - `Cache-Control: no-store` on pages, since prices depend on the viewer
/// - `Cross-Origin-Opener-Policy: same-origin`
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    match HeaderValue::from_str(&content_security_policy(&state.config().api_url)) {
        Ok(csp) => {
            headers.insert(CONTENT_SECURITY_POLICY, csp);
        }
        Err(e) => tracing::warn!(error = %e, "Invalid Content-Security-Policy"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );

    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_allows_backend_images() {
        let csp = content_security_policy(&Url::parse("https://api.imp360.fr/glpi/").unwrap());
        assert!(csp.contains("img-src 'self' data: https://api.imp360.fr;"));
        assert!(csp.contains("script-src 'self' https://unpkg.com;"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }
}
