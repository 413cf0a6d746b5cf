use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use nop_db::models::{Brand, NewProduct, Product, ProductCategories, ProductCategory};
use nop_db::{Record, RequestContext};
use nop_types::api::{CategoryResponse, CreateProductRequest, Data, ProductResponse};

use crate::auth::AppState;
use crate::categories::{category_index, lookup_category};
use crate::context::with_session;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Claims;
use crate::validation::Fields;

const NAME_MAX_CHARS: usize = 256;

pub(crate) fn product_response(
    product: Product,
    categories: &HashMap<i64, CategoryResponse>,
) -> Result<ProductResponse, ApiError> {
    Ok(ProductResponse {
        category: lookup_category(categories, product.category_id)?,
        id: product.id,
        name: product.name,
        image_url: product.image_url,
        brand_id: product.brand_id,
    })
}

pub async fn list_products(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let products = with_session(&state, &ctx, |session| {
        let categories = category_index::<ProductCategories>(session)?;
        Product::get_all(session, None, &[Product::ID.asc()])?
            .into_iter()
            .map(|product| product_response(product, &categories))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(Data::new(products)))
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let product = with_session(&state, &ctx, move |session| {
        let product = Product::get_one(session, Some(&Product::ID.eq(id)), &[], || {
            ApiError::NotFound(format!("product {} not found", id))
        })?;
        let categories = category_index::<ProductCategories>(session)?;
        product_response(product, &categories)
    })
    .await?;

    Ok(Json(Data::new(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = Fields::new();
    fields.text("name", &req.name, NAME_MAX_CHARS);
    fields.url("imageUrl", &req.image_url);
    fields.finish()?;

    let product = with_session(&state, &ctx, move |session| {
        if Product::get_by_name(session, &req.name)?.is_some() {
            return Err(ApiError::Conflict(format!("product '{}' already exists", req.name)));
        }

        let mut missing = Fields::new();
        if Brand::get_by_id(session, req.brand_id)?.is_none() {
            missing.reject("brandId");
        }
        if !ProductCategory::exists(session, req.category_id)? {
            missing.reject("categoryId");
        }
        missing.finish()?;

        Ok(session.save(NewProduct {
            name: req.name,
            image_url: req.image_url,
            brand_id: req.brand_id,
            category_id: req.category_id,
        })?)
    })
    .await?;

    info!("User {} created product {} ({})", claims.sub, product.id, product.name);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/products/{}", product.id))],
        Json(serde_json::json!({})),
    ))
}
