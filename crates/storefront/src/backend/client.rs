//! `BackendClient`: one method per backend endpoint.

use std::sync::Arc;
use std::time::Duration;

use imp360_core::{
    Account, AccountInput, Cart, Category, Company, CompanyId, CompanyInput, Identity,
    IdentityEnvelope, Price, Product, ProductId, ProductInput, TicketRequest, UserId,
};
use moka::future::Cache;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{BackendError, BackendSession, error_message};
use crate::config::StorefrontConfig;

/// How long product reads stay cached.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

/// An image to upload with a product form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the GLPI-backed REST API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base: Url,
    cache: Cache<String, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("imp360-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base: config.api_url.clone(),
                cache,
            }),
        })
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Parse("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        session: &BackendSession,
    ) -> Result<RequestBuilder, BackendError> {
        let mut request = self.inner.client.request(method, self.endpoint(segments)?);
        if let Some(cookie) = session.cookie() {
            request = request.header(COOKIE, cookie);
        }
        Ok(request)
    }

    /// Send a request, mapping non-success statuses to errors.
    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!(status = %status, message = %message, "Backend returned non-success status");

        Err(match status {
            StatusCode::UNAUTHORIZED => BackendError::Unauthenticated,
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            _ => BackendError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e.to_string())
        })
    }

    /// Send a request whose response body is ignored.
    async fn execute(request: RequestBuilder) -> Result<(), BackendError> {
        Self::send(request).await.map(drop)
    }

    /// Cart endpoints answer with the full line list; an empty body means an
    /// empty cart.
    async fn cart_response(request: RequestBuilder) -> Result<Cart, BackendError> {
        let response = Self::send(request).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Cart::default());
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in and capture the backend session cookie.
    ///
    /// # Errors
    ///
    /// Returns `Api` with the backend's message on bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(BackendSession, Identity), BackendError> {
        let request = self
            .request(Method::POST, &["api", "login"], &BackendSession::anonymous())?
            .json(&Credentials { email, password });
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect::<Vec<_>>()
            .join("; ");

        let envelope: IdentityEnvelope = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        let identity = envelope
            .user
            .ok_or_else(|| BackendError::Parse("login response has no user".to_string()))?;

        Ok((BackendSession::from_cookie(cookie), identity))
    }

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &BackendSession) -> Result<(), BackendError> {
        Self::execute(self.request(Method::POST, &["logout"], session)?).await
    }

    /// Fetch the signed-in identity. `None` when the session is not
    /// authenticated.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails for another reason.
    #[instrument(skip(self, session))]
    pub async fn me(&self, session: &BackendSession) -> Result<Option<Identity>, BackendError> {
        if session.is_anonymous() {
            return Ok(None);
        }
        match Self::json::<IdentityEnvelope>(self.request(Method::GET, &["me"], session)?).await {
            Ok(envelope) => Ok(envelope.user),
            Err(BackendError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Select the company the account orders for; returns the updated identity.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response has no user.
    #[instrument(skip(self, session))]
    pub async fn select_company(
        &self,
        session: &BackendSession,
        company: &CompanyId,
    ) -> Result<Identity, BackendError> {
        let request = self
            .request(Method::POST, &["select-company"], session)?
            .json(&json!({ "companyId": company }));
        let envelope: IdentityEnvelope = Self::json(request).await?;
        envelope
            .user
            .ok_or_else(|| BackendError::Parse("select-company response has no user".to_string()))
    }

    /// Change the account's company from the profile page.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn change_company(
        &self,
        session: &BackendSession,
        company: &CompanyId,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["change-company"], session)?
            .json(&json!({ "companyId": company }));
        Self::execute(request).await
    }

    /// # Errors
    ///
    /// Returns `Api` with the backend's message when the current password is wrong.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        session: &BackendSession,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["change-password"], session)?
            .json(&json!({
                "currentPassword": current_password,
                "newPassword": new_password,
            }));
        Self::execute(request).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List the products of a category.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(category = %category.as_str()))]
    pub async fn products_by_category(
        &self,
        session: &BackendSession,
        category: Category,
    ) -> Result<Arc<Vec<Product>>, BackendError> {
        let cache_key = format!("category:{}", category.as_str());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(products);
        }

        let request = self.request(
            Method::GET,
            &["products", "role", category.as_str()],
            session,
        )?;
        let products = Arc::new(Self::json::<Vec<Product>>(request).await?);
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Free-text product search.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn search_products(
        &self,
        session: &BackendSession,
        query: &str,
    ) -> Result<Vec<Product>, BackendError> {
        let request = self
            .request(Method::GET, &["products", "search"], session)?
            .query(&[("q", query)]);
        Self::json(request).await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn product(
        &self,
        session: &BackendSession,
        id: &ProductId,
    ) -> Result<Product, BackendError> {
        let cache_key = format!("product:{id}");
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.request(Method::GET, &["products", id.as_str()], session)?;
        let product: Product = Self::json(request).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// List every product (back-office).
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn products(&self, session: &BackendSession) -> Result<Vec<Product>, BackendError> {
        Self::json(self.request(Method::GET, &["products"], session)?).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        session: &BackendSession,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let request = self.request(Method::POST, &["products"], session)?.json(input);
        Self::execute(request).await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        session: &BackendSession,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &["products", id.as_str()], session)?
            .json(input);
        Self::execute(request).await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        session: &BackendSession,
        id: &ProductId,
    ) -> Result<(), BackendError> {
        Self::execute(self.request(Method::DELETE, &["products", id.as_str()], session)?).await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    /// Upload a product image; returns the URL the backend stored it under.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session, image), fields(file_name = %image.file_name, size = image.bytes.len()))]
    pub async fn upload_image(
        &self,
        session: &BackendSession,
        image: ImageUpload,
        name: &str,
    ) -> Result<String, BackendError> {
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("name", name.to_owned());
        let request = self.request(Method::POST, &["upload"], session)?.multipart(form);
        let uploaded: UploadResponse = Self::json(request).await?;
        Ok(uploaded.image_url)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn cart(&self, session: &BackendSession) -> Result<Cart, BackendError> {
        Self::cart_response(self.request(Method::GET, &["cart"], session)?).await
    }

    /// Add a product with its resolved unit price.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product, price = %price))]
    pub async fn add_to_cart(
        &self,
        session: &BackendSession,
        product: &ProductId,
        price: Price,
    ) -> Result<Cart, BackendError> {
        let request = self
            .request(Method::POST, &["cart"], session)?
            .json(&json!({ "productId": product, "price": price }));
        Self::cart_response(request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product))]
    pub async fn update_cart_quantity(
        &self,
        session: &BackendSession,
        product: &ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let request = self
            .request(Method::PATCH, &["cart"], session)?
            .json(&json!({ "productId": product, "quantity": quantity }));
        Self::cart_response(request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product))]
    pub async fn remove_from_cart(
        &self,
        session: &BackendSession,
        product: &ProductId,
    ) -> Result<Cart, BackendError> {
        Self::cart_response(self.request(Method::DELETE, &["cart", product.as_str()], session)?)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn clear_cart(&self, session: &BackendSession) -> Result<Cart, BackendError> {
        Self::cart_response(self.request(Method::DELETE, &["cart"], session)?).await
    }

    /// Create the order ticket in GLPI. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Api` carrying the backend's message on failure.
    #[instrument(skip(self, session, ticket), fields(items = ticket.items.len(), total = %ticket.total))]
    pub async fn create_ticket(
        &self,
        session: &BackendSession,
        ticket: &TicketRequest,
    ) -> Result<(), BackendError> {
        Self::execute(self.request(Method::POST, &["ticket"], session)?.json(ticket)).await
    }

    // =========================================================================
    // Companies
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn companies(&self, session: &BackendSession) -> Result<Vec<Company>, BackendError> {
        Self::json(self.request(Method::GET, &["companies"], session)?).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn create_company(
        &self,
        session: &BackendSession,
        input: &CompanyInput,
    ) -> Result<(), BackendError> {
        Self::execute(self.request(Method::POST, &["companies"], session)?.json(input)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(company_id = %id))]
    pub async fn update_company(
        &self,
        session: &BackendSession,
        id: &CompanyId,
        input: &CompanyInput,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &["companies", id.as_str()], session)?
            .json(input);
        Self::execute(request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(company_id = %id))]
    pub async fn delete_company(
        &self,
        session: &BackendSession,
        id: &CompanyId,
    ) -> Result<(), BackendError> {
        Self::execute(self.request(Method::DELETE, &["companies", id.as_str()], session)?).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn users(&self, session: &BackendSession) -> Result<Vec<Account>, BackendError> {
        Self::json(self.request(Method::GET, &["users"], session)?).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    #[instrument(skip(self, session), fields(user_id = %id))]
    pub async fn user(&self, session: &BackendSession, id: &UserId) -> Result<Account, BackendError> {
        Self::json(self.request(Method::GET, &["users", id.as_str()], session)?).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session, input), fields(email = %input.email))]
    pub async fn create_user(
        &self,
        session: &BackendSession,
        input: &AccountInput,
    ) -> Result<(), BackendError> {
        Self::execute(self.request(Method::POST, &["users"], session)?.json(input)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session, input), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        session: &BackendSession,
        id: &UserId,
        input: &AccountInput,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &["users", id.as_str()], session)?
            .json(input);
        Self::execute(request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %id))]
    pub async fn delete_user(&self, session: &BackendSession, id: &UserId) -> Result<(), BackendError> {
        Self::execute(self.request(Method::DELETE, &["users", id.as_str()], session)?).await
    }
}
