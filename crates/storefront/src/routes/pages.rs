//! Static legal pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, response::IntoResponse, routing::get};
use imp360_core::access::AppRoute;

use crate::state::AppState;
use crate::views::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "pages/mentions.html")]
pub struct LegalNoticeTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/confidentialite.html")]
pub struct PrivacyPolicyTemplate {
    pub page: PageContext,
}

/// Display the legal notice.
pub async fn legal_notice(page: PageContext) -> impl IntoResponse {
    LegalNoticeTemplate { page }
}

/// Display the privacy policy.
pub async fn privacy_policy(page: PageContext) -> impl IntoResponse {
    PrivacyPolicyTemplate { page }
}

/// Create the static pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(AppRoute::LegalNotice.path(), get(legal_notice))
        .route(AppRoute::PrivacyPolicy.path(), get(privacy_policy))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::{body_text, get, test_app, unreachable_state};

    #[tokio::test]
    async fn test_legal_pages_are_public() {
        let (app, _) = test_app(unreachable_state());

        let response = get(&app, "/mentionlegales", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Mentions légales"));

        let response = get(&app, "/politiqueconfidentialite", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Politique de confidentialité"));
    }
}
