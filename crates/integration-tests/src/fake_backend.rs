//! An in-memory GLPI backend speaking the storefront's wire format.
//!
//! Accounts sign in with `POST /api/login`, which issues a `connect.sid`
//! cookie; every other endpoint resolves the account from that cookie.
//! Writes are recorded so tests can assert on what the storefront sent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

const SESSION_COOKIE: &str = "connect.sid";

/// An account the backend knows, with its `/me` document.
#[derive(Clone)]
pub struct FakeAccount {
    pub email: String,
    pub password: String,
    pub user: Value,
}

impl FakeAccount {
    /// An account with `role`, attached to `c1` (taux1) and `c2` (taux2).
    #[must_use]
    pub fn new(email: &str, role: &str, selected: Option<&str>) -> Self {
        Self {
            email: email.to_owned(),
            password: "secret".to_owned(),
            user: json!({
                "_id": format!("u-{role}"),
                "email": email,
                "name": "Claire Martin",
                "role": role,
                "glpiId": 42,
                "companies": companies(),
                "selectedCompany": selected,
                "specs": { "client": { "phone": "0102030405" } }
            }),
        }
    }
}

fn companies() -> Value {
    json!([
        { "_id": "c1", "glpiId": "101", "name": "Clinique du Parc", "taux": "taux1" },
        { "_id": "c2", "glpiId": "102", "name": "Cabinet Vauban", "taux": "taux2" }
    ])
}

/// A screen priced 100 / 80 / 70 / 60.
#[must_use]
pub fn screen() -> Value {
    json!({
        "_id": "p1",
        "name": "Écran 27 pouces",
        "sku": "P27Q",
        "brand": "DELL",
        "type": "ECRAN",
        "model": "P2725H",
        "description": "Écran bureautique QHD",
        "price": 100,
        "pricet1": 80,
        "pricet2": 70,
        "pricet3": 60,
        "gn": true,
        "image": "",
        "role": "écrans",
        "specs": { "taille": "27", "resolution": "2560x1440" }
    })
}

struct CartLine {
    product: Value,
    quantity: u32,
    price: Value,
}

#[derive(Default)]
struct Data {
    accounts: Vec<FakeAccount>,
    sessions: HashMap<String, usize>,
    products: Vec<Value>,
    carts: HashMap<usize, Vec<CartLine>>,
    tickets: Vec<Value>,
    companies: Vec<Value>,
}

/// Handle on a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    data: Arc<Mutex<Data>>,
    url: Url,
}

impl FakeBackend {
    /// Serve `accounts` and `products` on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(accounts: Vec<FakeAccount>, products: Vec<Value>) -> Self {
        let data = Arc::new(Mutex::new(Data {
            accounts,
            products,
            companies: companies().as_array().cloned().unwrap_or_default(),
            ..Data::default()
        }));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        let app = router(Arc::clone(&data));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend stopped");
        });

        Self {
            data,
            url: Url::parse(&format!("http://{addr}/")).expect("Invalid fake backend URL"),
        }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().expect("Fake backend state poisoned")
    }

    /// `(product id, quantity, unit price)` of `email`'s cart.
    #[must_use]
    pub fn cart_of(&self, email: &str) -> Vec<(String, u32, f64)> {
        let data = self.data();
        let Some(account) = data.accounts.iter().position(|a| a.email == email) else {
            return Vec::new();
        };
        data.carts
            .get(&account)
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| {
                        (
                            line.product["_id"].as_str().unwrap_or_default().to_owned(),
                            line.quantity,
                            line.price.as_f64().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tickets received so far.
    #[must_use]
    pub fn tickets(&self) -> Vec<Value> {
        self.data().tickets.clone()
    }

    /// Companies as currently stored.
    #[must_use]
    pub fn companies(&self) -> Vec<Value> {
        self.data().companies.clone()
    }
}

type Shared = Arc<Mutex<Data>>;

fn router(data: Shared) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/select-company", post(select_company))
        .route("/products", get(all_products))
        .route("/products/search", get(search))
        .route("/products/role/{category}", get(by_category))
        .route("/products/{id}", get(product))
        .route("/cart", get(cart).post(add_to_cart).patch(set_quantity).delete(clear_cart))
        .route("/cart/{id}", delete(remove_line))
        .route("/ticket", post(ticket))
        .route("/companies", get(list_companies).post(create_company))
        .route("/users", get(users))
        .with_state(data)
}

fn lock(data: &Shared) -> MutexGuard<'_, Data> {
    data.lock().expect("Fake backend state poisoned")
}

/// Index of the account behind the request's session cookie.
fn account(data: &Data, headers: &HeaderMap) -> Option<usize> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, token)| data.sessions.get(token).copied())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Non authentifié" }))).into_response()
}

fn cart_json(data: &Data, account: usize) -> Value {
    let items: Vec<Value> = data
        .carts
        .get(&account)
        .map(|lines| {
            lines
                .iter()
                .map(|l| json!({ "product": l.product, "quantity": l.quantity, "price": l.price }))
                .collect()
        })
        .unwrap_or_default();
    json!({ "items": items })
}

async fn login(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = lock(&data);
    let found = data
        .accounts
        .iter()
        .position(|a| a.email == body["email"] && a.password == body["password"]);
    let Some(index) = found else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Email ou mot de passe incorrect" })),
        )
            .into_response();
    };

    let token = Uuid::new_v4().to_string();
    data.sessions.insert(token.clone(), index);
    let user = data.accounts[index].user.clone();
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly"))],
        Json(json!({ "user": user })),
    )
        .into_response()
}

async fn logout(State(data): State<Shared>, headers: HeaderMap) -> StatusCode {
    let mut data = lock(&data);
    if let Some(index) = account(&data, &headers) {
        data.sessions.retain(|_, a| *a != index);
    }
    StatusCode::OK
}

async fn me(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let data = lock(&data);
    account(&data, &headers).map_or_else(unauthorized, |index| {
        Json(json!({ "user": data.accounts[index].user })).into_response()
    })
}

async fn select_company(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let Some(index) = account(&data, &headers) else {
        return unauthorized();
    };
    let user = &mut data.accounts[index].user;
    user["selectedCompany"] = body["companyId"].clone();
    Json(json!({ "user": user })).into_response()
}

async fn all_products(State(data): State<Shared>) -> Json<Value> {
    Json(Value::Array(lock(&data).products.clone()))
}

async fn search(State(data): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let needle = query.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let found = lock(&data)
        .products
        .iter()
        .filter(|p| {
            p["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    Json(Value::Array(found))
}

async fn by_category(State(data): State<Shared>, Path(category): Path<String>) -> Json<Value> {
    let found = lock(&data)
        .products
        .iter()
        .filter(|p| p["role"] == category.as_str())
        .cloned()
        .collect();
    Json(Value::Array(found))
}

async fn product(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    lock(&data)
        .products
        .iter()
        .find(|p| p["_id"] == id.as_str())
        .map_or_else(
            || (StatusCode::NOT_FOUND, Json(json!({ "message": "Produit introuvable" }))).into_response(),
            |p| Json(p.clone()).into_response(),
        )
}

async fn cart(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let data = lock(&data);
    account(&data, &headers).map_or_else(unauthorized, |index| {
        Json(cart_json(&data, index)).into_response()
    })
}

async fn add_to_cart(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let Some(index) = account(&data, &headers) else {
        return unauthorized();
    };
    let Some(product) = data
        .products
        .iter()
        .find(|p| p["_id"] == body["productId"])
        .cloned()
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let lines = data.carts.entry(index).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product["_id"] == product["_id"]) {
        line.quantity += 1;
    } else {
        lines.push(CartLine {
            product,
            quantity: 1,
            price: body["price"].clone(),
        });
    }
    Json(cart_json(&data, index)).into_response()
}

async fn set_quantity(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let Some(index) = account(&data, &headers) else {
        return unauthorized();
    };
    let quantity = body["quantity"].as_u64().and_then(|q| u32::try_from(q).ok()).unwrap_or(1);
    if let Some(line) = data
        .carts
        .entry(index)
        .or_default()
        .iter_mut()
        .find(|l| l.product["_id"] == body["productId"])
    {
        line.quantity = quantity;
    }
    Json(cart_json(&data, index)).into_response()
}

async fn remove_line(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut data = lock(&data);
    let Some(index) = account(&data, &headers) else {
        return unauthorized();
    };
    data.carts
        .entry(index)
        .or_default()
        .retain(|l| l.product["_id"] != id.as_str());
    Json(cart_json(&data, index)).into_response()
}

async fn clear_cart(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let mut data = lock(&data);
    let Some(index) = account(&data, &headers) else {
        return unauthorized();
    };
    data.carts.remove(&index);
    Json(cart_json(&data, index)).into_response()
}

async fn ticket(State(data): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut data = lock(&data);
    if account(&data, &headers).is_none() {
        return unauthorized();
    }
    data.tickets.push(body);
    (StatusCode::CREATED, Json(json!({ "id": 1 }))).into_response()
}

async fn list_companies(State(data): State<Shared>) -> Json<Value> {
    Json(Value::Array(lock(&data).companies.clone()))
}

async fn create_company(State(data): State<Shared>, Json(mut body): Json<Value>) -> StatusCode {
    let mut data = lock(&data);
    body["_id"] = json!(format!("c{}", data.companies.len() + 1));
    data.companies.push(body);
    StatusCode::CREATED
}

async fn users(State(data): State<Shared>) -> Json<Value> {
    Json(Value::Array(
        lock(&data).accounts.iter().map(|a| a.user.clone()).collect(),
    ))
}
