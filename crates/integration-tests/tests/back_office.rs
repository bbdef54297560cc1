//! Administration of clients and companies.

use imp360_integration_tests::{FakeAccount, TestContext, body, location};
use reqwest::StatusCode;

const ADMIN: &str = "admin@imp360.fr";

#[tokio::test]
async fn test_admin_lists_accounts_and_counts_roles() {
    let ctx = TestContext::start(vec![
        FakeAccount::new(ADMIN, "admin", None),
        FakeAccount::new("moderateur@imp360.fr", "moderator", None),
        FakeAccount::new("client@clinique.fr", "client", Some("c1")),
    ])
    .await;
    ctx.sign_in(ADMIN).await;

    let response = ctx.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body(response).await;
    assert!(page.contains("client@clinique.fr"));
    assert!(page.contains("Administrateurs"));
}

#[tokio::test]
async fn test_admin_creates_company() {
    let ctx = TestContext::start(vec![FakeAccount::new(ADMIN, "admin", None)]).await;
    ctx.sign_in(ADMIN).await;

    let response = ctx
        .post(
            "/admin/companies",
            &[("name", "Pharmacie Centrale"), ("glpi_id", "103"), ("tier", "taux3")],
        )
        .await;
    assert_eq!(location(&response), Some("/admin?tab=companies"));
    assert!(
        ctx.backend
            .companies()
            .iter()
            .any(|c| c["name"] == "Pharmacie Centrale")
    );

    let page = body(ctx.get("/admin?tab=companies").await).await;
    assert!(page.contains("Entreprise créée avec succès"));
    assert!(page.contains("Pharmacie Centrale"));
}
