//! Cart mutations and order tickets.

use imp360_integration_tests::{FakeAccount, TestContext, body, location};
use reqwest::StatusCode;

const BUYER: &str = "acheteur@clinique.fr";

async fn buyer_with_screen() -> TestContext {
    let ctx = TestContext::start(vec![FakeAccount::new(BUYER, "user", None)]).await;
    ctx.sign_in_with_company(BUYER, "c1").await;
    ctx.post("/cart/add", &[("product_id", "p1")]).await;
    ctx
}

#[tokio::test]
async fn test_quantity_buttons_update_the_line() {
    let ctx = buyer_with_screen().await;

    let response = ctx
        .post("/cart/quantity", &[("product_id", "p1"), ("action", "increment")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body(response).await.contains("160.00 €"));
    assert_eq!(ctx.backend.cart_of(BUYER), vec![("p1".to_owned(), 2, 80.0)]);

    ctx.post("/cart/quantity", &[("product_id", "p1"), ("action", "decrement")])
        .await;
    assert_eq!(ctx.backend.cart_of(BUYER), vec![("p1".to_owned(), 1, 80.0)]);

    let response = ctx
        .post("/cart/quantity", &[("product_id", "p1"), ("action", "decrement")])
        .await;
    assert!(body(response).await.contains("La quantité doit être au moins 1"));
    assert_eq!(ctx.backend.cart_of(BUYER), vec![("p1".to_owned(), 1, 80.0)]);
}

#[tokio::test]
async fn test_quantity_change_starts_from_the_stored_line() {
    let ctx = buyer_with_screen().await;

    // A stale page still showing 5 units.
    ctx.post(
        "/cart/quantity",
        &[("product_id", "p1"), ("current", "5"), ("action", "increment")],
    )
    .await;
    assert_eq!(ctx.backend.cart_of(BUYER), vec![("p1".to_owned(), 2, 80.0)]);

    ctx.post(
        "/cart/quantity",
        &[("product_id", "p1"), ("current", "5"), ("action", "decrement")],
    )
    .await;
    assert_eq!(ctx.backend.cart_of(BUYER), vec![("p1".to_owned(), 1, 80.0)]);
}

#[tokio::test]
async fn test_ticket_is_sent_and_cart_emptied() {
    let ctx = buyer_with_screen().await;

    let response = ctx
        .post(
            "/cart/ticket",
            &[
                ("client_name", "Claire Martin"),
                ("client_phone", "0102030405"),
                ("client_email", BUYER),
                ("delivery_type", "technician"),
            ],
        )
        .await;
    assert_eq!(location(&response), Some("/cart"));

    let tickets = ctx.backend.tickets();
    assert_eq!(tickets.len(), 1);
    let ticket = &tickets[0];
    assert_eq!(ticket["deliveryType"], "technician");
    assert_eq!(ticket["items"][0]["quantity"], 1);
    assert_eq!(ticket["total"], 80.0);

    assert!(ctx.backend.cart_of(BUYER).is_empty());
    let page = body(ctx.get("/cart").await).await;
    assert!(page.contains("Le ticket GLPI a été créé avec succès."));
    assert!(page.contains("Votre panier est vide"));
}

#[tokio::test]
async fn test_invalid_contact_keeps_the_cart() {
    let ctx = buyer_with_screen().await;

    let response = ctx
        .post(
            "/cart/ticket",
            &[
                ("client_name", ""),
                ("client_phone", "12"),
                ("client_email", "pas-un-email"),
                ("delivery_type", "client"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body(response)
            .await
            .contains("Veuillez remplir tous les champs obligatoires correctement.")
    );
    assert!(ctx.backend.tickets().is_empty());
    assert_eq!(ctx.backend.cart_of(BUYER).len(), 1);
}

#[tokio::test]
async fn test_search_suggests_matching_products() {
    let ctx = buyer_with_screen().await;

    let page = body(ctx.get("/search/suggest?q=imprimante").await).await;
    assert!(page.contains("Aucun produit trouvé"));

    let page = body(ctx.get("/search/suggest?q=27%20pouces").await).await;
    assert!(page.contains("/product/p1"));
}
