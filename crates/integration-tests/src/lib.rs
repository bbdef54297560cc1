//! End-to-end harness for the IMP360 storefront.
//!
//! Each [`TestContext`] runs a [`FakeBackend`] and a storefront wired to
//! it, both on ephemeral ports, and drives them with a cookie-holding
//! `reqwest` client that does not follow redirects.
//!
//! ```rust,ignore
//! let ctx = TestContext::start(vec![FakeAccount::new("a@b.fr", "admin", None)]).await;
//! let response = ctx.sign_in("a@b.fr").await;
//! assert_eq!(location(&response), Some("/dashboard"));
//! ```

pub mod fake_backend;

use std::net::SocketAddr;

use imp360_storefront::config::StorefrontConfig;
use imp360_storefront::state::AppState;
use reqwest::{Client, Response, redirect};
use tower_sessions::MemoryStore;

pub use fake_backend::{FakeAccount, FakeBackend, screen};

/// A storefront and its backend.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub backend: FakeBackend,
}

impl TestContext {
    /// Start a backend knowing `accounts` and the [`screen`] product, and a
    /// storefront in front of it.
    ///
    /// # Panics
    ///
    /// Panics if a server cannot be started.
    pub async fn start(accounts: Vec<FakeAccount>) -> Self {
        let backend = FakeBackend::start(accounts, vec![screen()]).await;

        let config = StorefrontConfig::for_backend(backend.url().clone());
        let state = AppState::new(config).expect("Failed to build storefront state");
        let app = imp360_storefront::app(state, MemoryStore::default());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("Storefront stopped");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            backend,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Sign in with the fake backend's shared password.
    pub async fn sign_in(&self, email: &str) -> Response {
        self.post("/login", &[("email", email), ("password", "secret")])
            .await
    }

    /// Sign in and choose `company`, as a buyer does.
    ///
    /// # Panics
    ///
    /// Panics if the selection is refused.
    pub async fn sign_in_with_company(&self, email: &str, company: &str) {
        self.sign_in(email).await;
        let response = self.post("/select-company", &[("company_id", company)]).await;
        assert_eq!(location(&response), Some("/dashboard"));
    }
}

/// The `Location` of a redirect.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// # Panics
///
/// Panics if the body cannot be read.
pub async fn body(response: Response) -> String {
    response.text().await.expect("Failed to read body")
}
