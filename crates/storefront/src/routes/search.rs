//! Search-as-you-type suggestions (HTMX).
//!
//! The search box fires on every keystroke; the coordinator debounces per
//! session and drops superseded queries, which answer `204 No Content` so
//! htmx leaves the current suggestions in place.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;
use crate::search::SearchOutcome;
use crate::services::IdentityStore;
use crate::state::AppState;
use crate::views::ProductCard;

/// Suggestions shown under the search box.
const MAX_SUGGESTIONS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/search_results.html")]
pub struct SearchResultsTemplate {
    pub query: String,
    pub results: Vec<ProductCard>,
    pub failed: bool,
}

/// Key of this browser session's search counter, created on first use.
async fn search_key(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(key) = session.get::<String>(session_keys::SEARCH_KEY).await? {
        return Ok(key);
    }
    let key = Uuid::new_v4().to_string();
    session.insert(session_keys::SEARCH_KEY, &key).await?;
    Ok(key)
}

#[instrument(skip_all, fields(q = %query.q))]
pub async fn suggest(
    State(state): State<AppState>,
    session: Session,
    identity: IdentityStore,
    Query(query): Query<SuggestQuery>,
) -> Result<Response, AppError> {
    let key = search_key(&session).await?;
    let viewer = identity.current().await?;
    let backend = identity.backend_session().await?;
    let client = state.backend().clone();

    let outcome = state
        .search()
        .search(&key, &query.q, |q| async move {
            client.search_products(&backend, &q).await
        })
        .await;

    let template = |results: Vec<ProductCard>, failed: bool| SearchResultsTemplate {
        query: query.q.trim().to_string(),
        results,
        failed,
    };

    Ok(match outcome {
        Ok(SearchOutcome::Superseded) => StatusCode::NO_CONTENT.into_response(),
        Ok(SearchOutcome::Empty) => template(Vec::new(), false).into_response(),
        Ok(SearchOutcome::Results(products)) => template(
            products
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|p| ProductCard::new(viewer.as_ref(), p))
                .collect(),
            false,
        )
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Search failed");
            template(Vec::new(), true).into_response()
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{body_text, get, test_app, unreachable_state};

    #[tokio::test]
    async fn test_blank_query_clears_suggestions() {
        let (app, _) = test_app(unreachable_state());
        let response = get(&app, "/search/suggest?q=%20", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("search-result"));
    }

    #[tokio::test]
    async fn test_backend_failure_renders_message() {
        let (app, _) = test_app(unreachable_state());
        let response = get(&app, "/search/suggest?q=onduleur", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Erreur lors de la recherche"));
    }
}
