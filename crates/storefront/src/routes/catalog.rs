//! Catalogue route handlers: dashboard, category pages and product detail.
//!
//! Prices are resolved for the viewer on every render; the same product
//! shows a different price to a tier-1 client, a visitor and staff.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use imp360_core::catalog::{self, ActiveFilters, FilterConfig, FilterKind};
use imp360_core::{Category, Identity, Product, ProductId};
use tracing::{instrument, warn};

use crate::backend::BackendError;
use crate::error::AppError;
use crate::middleware::RequireCompany;
use crate::models::FlashMessage;
use crate::services::IdentityStore;
use crate::state::AppState;
use crate::views::{CategoryLink, PageContext, ProductCard};

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "catalog/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub categories: Vec<CategoryLink>,
}

/// Category grid, once a company is selected.
pub async fn dashboard(RequireCompany(_identity): RequireCompany, page: PageContext) -> impl IntoResponse {
    DashboardTemplate {
        categories: page.categories(),
        page,
    }
}

// =============================================================================
// Category
// =============================================================================

/// Grid of cards or compact list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    List,
}

impl ViewMode {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("list") => Self::List,
            _ => Self::Grid,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }
}

/// One option of a filter, as rendered.
pub struct FilterOption {
    pub value: &'static str,
    pub selected: bool,
}

/// A category filter, as rendered.
pub struct FilterView {
    pub label: &'static str,
    pub is_select: bool,
    pub options: Vec<FilterOption>,
}

impl FilterView {
    fn new(config: &FilterConfig, active: &ActiveFilters) -> Self {
        Self {
            label: config.label,
            is_select: config.kind == FilterKind::Select,
            options: config
                .options
                .iter()
                .map(|&value| FilterOption {
                    value,
                    selected: active.is_selected(config.label, value),
                })
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "catalog/category.html")]
pub struct CategoryTemplate {
    pub page: PageContext,
    pub category: &'static str,
    pub path: String,
    pub filters: Vec<FilterView>,
    pub products: Vec<ProductCard>,
    pub view: ViewMode,
    /// Current filters as a query string, without the view mode.
    pub filter_query: String,
}

impl CategoryTemplate {
    fn is_list(&self) -> bool {
        self.view == ViewMode::List
    }

    fn view_url(&self, mode: &str) -> String {
        if self.filter_query.is_empty() {
            format!("{}?view={mode}", self.path)
        } else {
            format!("{}?{}&view={mode}", self.path, self.filter_query)
        }
    }

    fn view_value(&self) -> &'static str {
        self.view.as_str()
    }
}

fn query_string(active: &ActiveFilters) -> String {
    active
        .pairs()
        .map(|(label, option)| {
            format!("{}={}", urlencoding::encode(label), urlencoding::encode(option))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Products of a category, filtered by the ticked options.
#[instrument(skip_all, fields(category = %slug))]
pub async fn category(
    Path(slug): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    mut page: PageContext,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let category = Category::parse(&slug)
        .ok_or_else(|| AppError::NotFound(format!("catégorie {slug}")))?;

    let view = ViewMode::parse(
        query
            .iter()
            .find(|(key, _)| key == "view")
            .map(|(_, value)| value.as_str()),
    );
    let active = ActiveFilters::from_pairs(
        category,
        query.iter().map(|(key, value)| (key.as_str(), value.as_str())),
    );
    let configs = catalog::filters_for(category);

    let backend = identity.backend_session().await?;
    let products = match state.backend().products_by_category(&backend, category).await {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, category = category.as_str(), "Impossible de charger les produits");
            page.flashes
                .push(FlashMessage::error("Impossible de charger les produits"));
            Arc::default()
        }
    };

    let cards = catalog::apply(&products, configs, &active)
        .into_iter()
        .map(|product| ProductCard::new(page.viewer.as_ref(), product))
        .collect();

    Ok(CategoryTemplate {
        page,
        category: category.label(),
        path: format!("/categorie/{}", category.slug()),
        filters: configs.iter().map(|c| FilterView::new(c, &active)).collect(),
        products: cards,
        view,
        filter_query: query_string(&active),
    }
    .into_response())
}

// =============================================================================
// Product detail
// =============================================================================

/// A product's full record, as rendered.
pub struct ProductDetail {
    pub card: ProductCard,
    pub sku: String,
    pub description: String,
    pub description2: Option<String>,
    pub guarantee: Option<String>,
    pub category: Option<CategoryLink>,
    pub specs: Vec<(String, String)>,
}

impl ProductDetail {
    fn new(viewer: Option<&Identity>, product: &Product) -> Self {
        Self {
            card: ProductCard::new(viewer, product),
            sku: product.sku.clone(),
            description: product.description.clone(),
            description2: product.description2.clone().filter(|d| !d.trim().is_empty()),
            guarantee: product.guarantee.clone().filter(|g| !g.trim().is_empty()),
            category: product.category.map(CategoryLink::from),
            specs: product
                .specs
                .ordered_for(product.category)
                .into_iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(key, value)| (catalog::spec_label(key).to_owned(), value.to_owned()))
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "catalog/product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: Option<ProductDetail>,
}

impl ProductTemplate {
    fn card(&self) -> Option<&ProductCard> {
        self.product.as_ref().map(|p| &p.card)
    }
}

/// Product detail with the viewer's price and the specification table.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn product(
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    mut page: PageContext,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    match state.backend().product(&backend, &ProductId::new(id)).await {
        Ok(product) => Ok(ProductTemplate {
            product: Some(ProductDetail::new(page.viewer.as_ref(), &product)),
            page,
        }
        .into_response()),
        Err(e) => {
            warn!(error = %e, "Impossible de charger les détails du produit");
            page.flashes
                .push(FlashMessage::error("Impossible de charger les détails du produit"));
            let status = if matches!(e, BackendError::NotFound(_)) {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_GATEWAY
            };
            Ok((status, ProductTemplate { page, product: None }).into_response())
        }
    }
}
