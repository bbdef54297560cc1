//! Route gates: sign-in, roles and company selection.

use imp360_integration_tests::{FakeAccount, TestContext, body, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_visitor_cannot_reach_product_form() {
    let ctx = TestContext::start(Vec::new()).await;

    let response = ctx.get("/new-product").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), Some("/login"));
    assert!(!body(response).await.contains("spec-fields"));
}

#[tokio::test]
async fn test_client_without_company_is_sent_to_selection() {
    let email = "client@clinique.fr";
    let ctx = TestContext::start(vec![FakeAccount::new(email, "client", None)]).await;

    let response = ctx.sign_in(email).await;
    assert_eq!(location(&response), Some("/select-company"));

    let response = ctx.get("/dashboard").await;
    assert_eq!(location(&response), Some("/select-company"));

    let page = body(ctx.get("/select-company").await).await;
    assert!(page.contains("Clinique du Parc"));
    assert!(page.contains("Cabinet Vauban"));
}

#[tokio::test]
async fn test_htmx_requests_get_hx_redirect() {
    let ctx = TestContext::start(Vec::new()).await;

    let response = ctx
        .client
        .get(ctx.url("/intern"))
        .header("hx-request", "true")
        .send()
        .await
        .expect("GET failed");
    assert_eq!(
        response.headers().get("hx-redirect").and_then(|v| v.to_str().ok()),
        Some("/login")
    );
}

#[tokio::test]
async fn test_moderator_reaches_products_but_not_clients() {
    let email = "moderateur@imp360.fr";
    let ctx = TestContext::start(vec![FakeAccount::new(email, "moderator", None)]).await;
    ctx.sign_in(email).await;

    let response = ctx.get("/intern").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body(response).await.contains("Gestion des produits"));

    let response = ctx.get("/admin").await;
    assert_eq!(location(&response), Some("/dashboard"));
}

#[tokio::test]
async fn test_wrong_password_keeps_visitor_on_login() {
    let email = "client@clinique.fr";
    let ctx = TestContext::start(vec![FakeAccount::new(email, "client", None)]).await;

    let response = ctx
        .post("/login", &[("email", email), ("password", "mauvais")])
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body(response).await.contains("Email ou mot de passe incorrect"));
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let email = "admin@imp360.fr";
    let ctx = TestContext::start(vec![FakeAccount::new(email, "admin", None)]).await;
    ctx.sign_in(email).await;
    assert_eq!(ctx.get("/dashboard").await.status(), StatusCode::OK);

    let response = ctx.post("/logout", &[]).await;
    assert_eq!(location(&response), Some("/login"));
    assert_eq!(location(&ctx.get("/dashboard").await), Some("/login"));
}
