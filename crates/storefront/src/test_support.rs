//! Shared fixtures for unit and handler tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use imp360_core::Identity;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};
use url::Url;

use crate::config::StorefrontConfig;
use crate::middleware::SESSION_COOKIE_NAME;
use crate::models::{CachedIdentity, session_keys};
use crate::state::AppState;

/// Backend cookie stored for seeded sessions.
pub const BACKEND_COOKIE: &str = "connect.sid=s%3Atest";

/// State whose backend refuses every connection.
pub fn unreachable_state() -> AppState {
    let config = StorefrontConfig::for_backend(Url::parse("http://127.0.0.1:9/").unwrap());
    AppState::new(config).unwrap()
}

/// Identity document as `GET /me` returns it, attached to two companies:
/// `c1` (tier 1) and `c2` (tier 2).
pub fn identity_json(role: &str, selected: Option<&str>) -> Value {
    json!({
        "_id": "u1",
        "email": "acheteur@clinique.fr",
        "name": "Claire Martin",
        "role": role,
        "glpiId": 42,
        "companies": [
            { "_id": "c1", "glpiId": "101", "name": "Clinique du Parc", "taux": "taux1" },
            { "_id": "c2", "glpiId": "102", "name": "Cabinet Vauban", "taux": "taux2" }
        ],
        "selectedCompany": selected,
        "specs": { "client": { "phone": "0102030405" } }
    })
}

pub fn identity(role: &str, selected: Option<&str>) -> Identity {
    serde_json::from_value(identity_json(role, selected)).unwrap()
}

async fn seed(session: &Session, identity: Option<&Identity>) {
    if let Some(identity) = identity {
        session
            .insert(session_keys::BACKEND_COOKIE, BACKEND_COOKIE)
            .await
            .unwrap();
        session
            .insert(session_keys::IDENTITY, CachedIdentity::fresh(identity.clone()))
            .await
            .unwrap();
    }
}

/// A standalone session, signed in as `identity` when given.
pub async fn seeded_session(identity: Option<&Identity>) -> Session {
    let session = Session::new(None, Arc::new(MemoryStore::default()), None);
    seed(&session, identity).await;
    session
}

/// Save a session in `store` and return the `Cookie` header pointing at it.
pub async fn session_cookie(store: &MemoryStore, identity: Option<&Identity>) -> String {
    let session = Session::new(None, Arc::new(store.clone()), None);
    seed(&session, identity).await;
    // Empty sessions are not persisted.
    session.insert("seeded", true).await.unwrap();
    session.save().await.unwrap();
    format!("{SESSION_COOKIE_NAME}={}", session.id().unwrap())
}

/// The full application over `state`, with its session store.
pub fn test_app(state: AppState) -> (Router, MemoryStore) {
    let store = MemoryStore::default();
    (crate::app(state, store.clone()), store)
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &Router, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_owned())).unwrap())
        .await
        .unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
