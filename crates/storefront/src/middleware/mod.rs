//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and isolation headers)
//! 5. Session layer (tower-sessions with the in-memory store)
//! 6. Rate limiting on `POST /login` (governor)
//!
//! Route gates are extractors (see [`auth`]), evaluated per handler.

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AdminOnly, Buyer, GateRejection, OptionalIdentity, RequireCompany, RequireIdentity,
    RequireRole, Staff, is_htmx, navigate,
};
pub use flash::Flash;
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
