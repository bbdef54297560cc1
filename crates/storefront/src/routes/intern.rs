//! Product back-office for moderators and administrators.
//!
//! Product forms are multipart: the image is uploaded first and the URL
//! the backend returns goes into the product document. On update the
//! current image is kept unless a new file is chosen.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use imp360_core::{Category, Price, Product, ProductId, ProductInput, ProductPrices, SpecField, Specs};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::backend::ImageUpload;
use crate::error::AppError;
use crate::middleware::{Flash, RequireRole, Staff, is_htmx, navigate};
use crate::models::FlashMessage;
use crate::services::IdentityStore;
use crate::state::AppState;
use crate::views::PageContext;

const INTERN: &str = "/intern";

/// Prefix of the specification inputs of the product form.
const SPEC_PREFIX: &str = "spec_";

// =============================================================================
// Product table
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

impl CategoryQuery {
    fn category(&self) -> Option<Category> {
        self.category.as_deref().and_then(Category::parse)
    }
}

/// A row of the product table.
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub kind: String,
    pub model: String,
    pub price: String,
    pub category: &'static str,
    pub national_range: bool,
    pub image: String,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.display_name().to_owned(),
            sku: product.sku.clone(),
            brand: product.brand.clone(),
            kind: product.kind.clone(),
            model: product.model.clone(),
            price: product.prices.public.to_string(),
            category: product.category.map_or("", Category::label),
            national_range: product.national_range,
            image: product.image.clone(),
        }
    }
}

/// A category of the filter and form selects.
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn category_options(selected: Option<Category>) -> Vec<CategoryOption> {
    Category::ALL
        .into_iter()
        .map(|category| CategoryOption {
            value: category.slug(),
            label: category.label(),
            selected: selected == Some(category),
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "intern/index.html")]
pub struct InternTemplate {
    pub page: PageContext,
    pub products: Vec<ProductRow>,
    pub categories: Vec<CategoryOption>,
}

/// The product table, optionally narrowed to one category.
#[instrument(skip_all)]
pub async fn index(
    RequireRole { .. }: RequireRole<Staff>,
    identity: IdentityStore,
    State(state): State<AppState>,
    mut page: PageContext,
    Query(query): Query<CategoryQuery>,
) -> Result<Response, AppError> {
    let filter = query.category();
    let backend = identity.backend_session().await?;
    let products = match state.backend().products(&backend).await {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "Impossible de charger les produits");
            page.flashes
                .push(FlashMessage::error("Impossible de charger les produits"));
            Vec::new()
        }
    };

    Ok(InternTemplate {
        page,
        products: products
            .iter()
            .filter(|p| filter.is_none() || p.category == filter)
            .map(ProductRow::from)
            .collect(),
        categories: category_options(filter),
    }
    .into_response())
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete_product(
    RequireRole { .. }: RequireRole<Staff>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    match state.backend().delete_product(&backend, &ProductId::new(id)).await {
        Ok(()) => flash.success("Produit supprimé avec succès").await,
        Err(e) => {
            warn!(error = %e, "Product deletion failed");
            flash.error("Impossible de supprimer le produit").await;
        }
    }
    Ok(navigate(INTERN, is_htmx(&headers)))
}

// =============================================================================
// Product form
// =============================================================================

/// Values of the product form, as typed.
#[derive(Debug, Default, Clone)]
pub struct ProductFormValues {
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub kind: String,
    pub model: String,
    pub description: String,
    pub description2: String,
    pub price: String,
    pub price_t1: String,
    pub price_t2: String,
    pub price_t3: String,
    pub guarantee: String,
    pub national_range: bool,
    /// URL of the image already stored for the product.
    pub current_image: String,
    pub category: Option<Category>,
    pub specs: Specs,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        let amount = |price: Price| price.amount().to_string();
        Self {
            name: product.name.clone(),
            sku: product.sku.clone(),
            brand: product.brand.clone(),
            kind: product.kind.clone(),
            model: product.model.clone(),
            description: product.description.clone(),
            description2: product.description2.clone().unwrap_or_default(),
            price: amount(product.prices.public),
            price_t1: amount(product.prices.tier1),
            price_t2: amount(product.prices.tier2),
            price_t3: amount(product.prices.tier3),
            guarantee: product.guarantee.clone().unwrap_or_default(),
            national_range: product.national_range,
            current_image: product.image.clone(),
            category: product.category,
            specs: product.specs.clone(),
        }
    }
}

/// Why a submitted product form was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum ProductFormError {
    /// Labels of the required fields left empty.
    Missing(Vec<&'static str>),
    InvalidPrice(&'static str),
}

impl ProductFormError {
    fn message(&self) -> String {
        match self {
            Self::Missing(fields) => format!("Champs manquants : {}", fields.join(", ")),
            Self::InvalidPrice(label) => format!("Prix invalide : {label}"),
        }
    }
}

impl ProductFormValues {
    fn from_fields(mut fields: HashMap<String, String>) -> Self {
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        let mut values = Self {
            name: take("name"),
            sku: take("sku"),
            brand: take("brand"),
            kind: take("kind"),
            model: take("model"),
            description: take("description"),
            description2: take("description2"),
            price: take("price"),
            price_t1: take("price_t1"),
            price_t2: take("price_t2"),
            price_t3: take("price_t3"),
            guarantee: take("guarantee"),
            national_range: !take("national_range").is_empty(),
            current_image: take("current_image"),
            category: Category::parse(&take("category")),
            specs: Specs::new(),
        };
        values.specs = fields
            .into_iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(SPEC_PREFIX)
                    .map(|key| (key.to_owned(), value.trim().to_owned()))
            })
            .collect();
        values
    }

    /// Check the required fields and build the document to send.
    ///
    /// The tier prices default to zero when left empty.
    fn to_input(&self, has_image: bool) -> Result<ProductInput, ProductFormError> {
        let mut missing = Vec::new();
        if !has_image && self.current_image.trim().is_empty() {
            missing.push("image");
        }
        for (label, value) in [
            ("nom", &self.name),
            ("prix", &self.price),
            ("SKU", &self.sku),
            ("marque", &self.brand),
            ("type", &self.kind),
            ("modèle", &self.model),
        ] {
            if value.trim().is_empty() {
                missing.push(label);
            }
        }
        let Some(category) = self.category else {
            missing.push("catégorie");
            return Err(ProductFormError::Missing(missing));
        };
        if !missing.is_empty() {
            return Err(ProductFormError::Missing(missing));
        }

        let price = |label: &'static str, value: &str, optional: bool| {
            if optional && value.trim().is_empty() {
                return Ok(Price::ZERO);
            }
            Price::parse(value).map_err(|_| ProductFormError::InvalidPrice(label))
        };

        Ok(ProductInput {
            name: self.name.trim().to_owned(),
            sku: self.sku.trim().to_owned(),
            brand: self.brand.trim().to_owned(),
            kind: self.kind.trim().to_owned(),
            model: self.model.trim().to_owned(),
            description: self.description.trim().to_owned(),
            description2: self.description2.trim().to_owned(),
            prices: ProductPrices {
                public: price("prix public", &self.price, false)?,
                tier1: price("prix taux 1", &self.price_t1, true)?,
                tier2: price("prix taux 2", &self.price_t2, true)?,
                tier3: price("prix taux 3", &self.price_t3, true)?,
            },
            guarantee: self.guarantee.trim().to_owned(),
            national_range: self.national_range,
            image: self.current_image.trim().to_owned(),
            category,
            specs: self.specs.clone(),
        }
        .with_category_specs())
    }
}

/// The product form as submitted: text fields and the optional image.
struct ProductSubmission {
    values: ProductFormValues,
    image: Option<ImageUpload>,
}

async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Formulaire illisible : {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Image illisible : {e}")))?;
            // Browsers send an empty part when no file is chosen.
            if !file_name.is_empty() && !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Champ {name} illisible : {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok(ProductSubmission {
        values: ProductFormValues::from_fields(fields),
        image,
    })
}

/// A specification input of the form.
pub struct SpecInput {
    pub name: String,
    pub label: &'static str,
    pub value: String,
}

fn spec_inputs(values: &ProductFormValues) -> Vec<SpecInput> {
    values
        .category
        .map_or(&[][..], Category::spec_fields)
        .iter()
        .map(|&SpecField { key, label }| SpecInput {
            name: format!("{SPEC_PREFIX}{key}"),
            label,
            value: values.specs.get(key).unwrap_or_default().to_owned(),
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "intern/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub values: ProductFormValues,
    pub categories: Vec<CategoryOption>,
    pub specs: Vec<SpecInput>,
    pub image_required: bool,
}

impl ProductFormTemplate {
    fn new(page: PageContext, title: &'static str, action: String, values: ProductFormValues) -> Self {
        Self {
            page,
            title,
            action,
            categories: category_options(values.category),
            specs: spec_inputs(&values),
            image_required: values.current_image.is_empty(),
            values,
        }
    }
}

/// Empty product form. Choosing a category reloads it with that
/// category's specification fields.
pub async fn new_product(
    RequireRole { .. }: RequireRole<Staff>,
    page: PageContext,
    Query(query): Query<CategoryQuery>,
) -> Response {
    let values = ProductFormValues {
        category: query.category(),
        ..ProductFormValues::default()
    };
    ProductFormTemplate::new(page, "Nouveau produit", "/new-product".to_string(), values)
        .into_response()
}

#[instrument(skip_all)]
pub async fn create_product(
    RequireRole { .. }: RequireRole<Staff>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    mut page: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let ProductSubmission { values, image } = read_submission(multipart).await?;

    let mut input = match values.to_input(image.is_some()) {
        Ok(input) => input,
        Err(e) => {
            page.flashes.push(FlashMessage::error(e.message()));
            let form = ProductFormTemplate::new(page, "Nouveau produit", "/new-product".to_string(), values);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, form).into_response());
        }
    };

    let backend = identity.backend_session().await?;
    let created = async {
        if let Some(image) = image {
            input.image = state.backend().upload_image(&backend, image, &input.name).await?;
        }
        state.backend().create_product(&backend, &input).await
    }
    .await;

    match created {
        Ok(()) => {
            info!(sku = %input.sku, "Product created");
            flash.success("Produit créé avec succès").await;
            Ok(navigate(INTERN, false))
        }
        Err(e) => {
            warn!(error = %e, "Product creation failed");
            page.flashes
                .push(FlashMessage::error("Impossible de créer le produit"));
            let form = ProductFormTemplate::new(page, "Nouveau produit", "/new-product".to_string(), values);
            Ok((StatusCode::BAD_GATEWAY, form).into_response())
        }
    }
}

/// The product form, filled in with the stored product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn edit_product(
    RequireRole { .. }: RequireRole<Staff>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    page: PageContext,
    Query(query): Query<CategoryQuery>,
) -> Result<Response, AppError> {
    let backend = identity.backend_session().await?;
    let product = match state.backend().product(&backend, &ProductId::new(id.clone())).await {
        Ok(product) => product,
        Err(e) => {
            warn!(error = %e, "Impossible de charger le produit");
            flash.error("Impossible de charger le produit").await;
            return Ok(navigate(INTERN, false));
        }
    };

    let mut values = ProductFormValues::from(&product);
    if let Some(category) = query.category() {
        values.category = Some(category);
    }
    Ok(ProductFormTemplate::new(page, "Modifier le produit", format!("/modify-product/{id}"), values)
        .into_response())
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn update_product(
    RequireRole { .. }: RequireRole<Staff>,
    Path(id): Path<String>,
    identity: IdentityStore,
    State(state): State<AppState>,
    flash: Flash,
    mut page: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let ProductSubmission { values, image } = read_submission(multipart).await?;
    let action = format!("/modify-product/{id}");

    let mut input = match values.to_input(image.is_some()) {
        Ok(input) => input,
        Err(e) => {
            page.flashes.push(FlashMessage::error(e.message()));
            let form = ProductFormTemplate::new(page, "Modifier le produit", action, values);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, form).into_response());
        }
    };

    let backend = identity.backend_session().await?;
    let product = ProductId::new(id);
    let updated = async {
        if let Some(image) = image {
            input.image = state.backend().upload_image(&backend, image, &input.name).await?;
        }
        state.backend().update_product(&backend, &product, &input).await
    }
    .await;

    match updated {
        Ok(()) => {
            flash.success("Produit modifié avec succès").await;
            Ok(navigate(INTERN, false))
        }
        Err(e) => {
            warn!(error = %e, "Product update failed");
            page.flashes
                .push(FlashMessage::error("Impossible de modifier le produit"));
            let form = ProductFormTemplate::new(page, "Modifier le produit", action, values);
            Ok((StatusCode::BAD_GATEWAY, form).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{
        body_text, get, identity, location, session_cookie, test_app, unreachable_state,
    };

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        fields(&[
            ("name", "Latitude 5440"),
            ("sku", "5440"),
            ("brand", "DELL"),
            ("kind", "PC PORTABLE"),
            ("model", "5440"),
            ("price", "1099,90"),
            ("price_t1", "950"),
            ("price_t2", ""),
            ("category", "ordinateurs"),
            ("national_range", "on"),
            ("spec_cpu", " Intel Core i5 "),
            ("spec_displaysize", "24"),
        ])
    }

    #[test]
    fn test_complete_form_builds_input() {
        let values = ProductFormValues::from_fields(complete());
        let input = values.to_input(true).unwrap();
        assert_eq!(input.category, Category::Computers);
        assert_eq!(input.prices.public, Price::parse("1099.90").unwrap());
        assert_eq!(input.prices.tier2, Price::ZERO);
        assert!(input.national_range);
        assert_eq!(input.specs.get("cpu"), Some("Intel Core i5"));
        // Not a computer field.
        assert_eq!(input.specs.get("displaysize"), None);
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let mut form = complete();
        form.remove("brand");
        form.remove("price");
        let values = ProductFormValues::from_fields(form);
        let err = values.to_input(false).unwrap_err();
        assert_eq!(err, ProductFormError::Missing(vec!["image", "prix", "marque"]));
        assert_eq!(err.message(), "Champs manquants : image, prix, marque");
    }

    #[test]
    fn test_existing_image_satisfies_requirement() {
        let mut form = complete();
        form.insert("current_image".into(), "https://cdn.imp360.fr/latitude.jpg".into());
        let input = ProductFormValues::from_fields(form).to_input(false).unwrap();
        assert_eq!(input.image, "https://cdn.imp360.fr/latitude.jpg");
    }

    #[test]
    fn test_invalid_price_rejected() {
        let mut form = complete();
        form.insert("price_t3".into(), "gratuit".into());
        let err = ProductFormValues::from_fields(form).to_input(true).unwrap_err();
        assert_eq!(err, ProductFormError::InvalidPrice("prix taux 3"));
    }

    #[test]
    fn test_spec_inputs_follow_category() {
        let values = ProductFormValues {
            category: Some(Category::Screens),
            specs: [("resolution", "2560x1440")].into_iter().collect(),
            ..ProductFormValues::default()
        };
        let inputs = spec_inputs(&values);
        let resolution = inputs.iter().find(|i| i.name == "spec_resolution").unwrap();
        assert_eq!(resolution.value, "2560x1440");
        assert!(spec_inputs(&ProductFormValues::default()).is_empty());
    }

    #[tokio::test]
    async fn test_visitor_never_sees_product_form() {
        let (app, _) = test_app(unreachable_state());
        let response = get(&app, "/new-product", None).await;
        assert_eq!(location(&response), Some("/login"));
    }

    #[tokio::test]
    async fn test_client_is_sent_back_to_dashboard() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("client", Some("c1")))).await;
        let response = get(&app, "/intern", Some(&cookie)).await;
        assert_eq!(location(&response), Some("/dashboard"));
    }

    #[tokio::test]
    async fn test_moderator_gets_form_with_category_fields() {
        let (app, store) = test_app(unreachable_state());
        let cookie = session_cookie(&store, Some(&identity("moderator", None))).await;
        let response = get(&app, "/new-product?category=ecrans", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"spec_resolution\""));
    }
}
