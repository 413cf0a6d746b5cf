use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use nop_db::models::{
    Brand, BrandCategories, BrandCategory, BrandUpdate, NewBrand, ProductCategories,
};
use nop_db::{Record, RequestContext, Session};
use nop_types::api::{
    BrandDetailResponse, BrandResponse, CategoryResponse, CreateBrandRequest, Data,
    UpdateBrandRequest,
};

use crate::auth::AppState;
use crate::categories::{category_index, lookup_category};
use crate::context::with_session;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Claims;
use crate::products::product_response;
use crate::validation::Fields;

const NAME_MAX_CHARS: usize = 128;

fn brand_response(
    brand: Brand,
    categories: &HashMap<i64, CategoryResponse>,
) -> Result<BrandResponse, ApiError> {
    Ok(BrandResponse {
        category: lookup_category(categories, brand.category_id)?,
        id: brand.id,
        name: brand.name,
        logo_url: brand.logo_url,
    })
}

fn brand_responses(session: &Session, brands: Vec<Brand>) -> Result<Vec<BrandResponse>, ApiError> {
    let categories = category_index::<BrandCategories>(session)?;
    brands
        .into_iter()
        .map(|brand| brand_response(brand, &categories))
        .collect()
}

fn find_brand(session: &Session, id: i64) -> Result<Brand, ApiError> {
    Brand::get_one(session, Some(&Brand::ID.eq(id)), &[], || {
        ApiError::NotFound(format!("brand {} not found", id))
    })
}

pub async fn list_brands(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let brands = with_session(&state, &ctx, |session| {
        let brands = Brand::get_all(session, None, &[Brand::ID.asc()])?;
        brand_responses(session, brands)
    })
    .await?;

    Ok(Json(Data::new(brands)))
}

pub async fn create_brand(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = Fields::new();
    fields.text("name", &req.name, NAME_MAX_CHARS);
    fields.url("logoUrl", &req.logo_url);
    fields.finish()?;

    let brand = with_session(&state, &ctx, move |session| {
        if Brand::get_by_name(session, &req.name)?.is_some() {
            return Err(ApiError::Conflict(format!("brand '{}' already exists", req.name)));
        }
        if !BrandCategory::exists(session, req.category_id)? {
            return Err(ApiError::invalid("categoryId"));
        }

        // A constraint failure here can only be a concurrent insert of the
        // same name; it surfaces as a conflict.
        Ok(session.save(NewBrand {
            name: req.name,
            logo_url: req.logo_url,
            category_id: req.category_id,
        })?)
    })
    .await?;

    info!("User {} created brand {} ({})", claims.sub, brand.id, brand.name);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/brands/{}", brand.id))],
        Json(serde_json::json!({})),
    ))
}

/// A brand's products plus the other brands in its category.
pub async fn get_brand(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = with_session(&state, &ctx, move |session| {
        let brand = find_brand(session, id)?;

        let product_categories = category_index::<ProductCategories>(session)?;
        let products = brand
            .products(session)?
            .into_iter()
            .map(|product| product_response(product, &product_categories))
            .collect::<Result<Vec<_>, _>>()?;

        let alternatives = brand_responses(session, brand.alternatives(session)?)?;

        Ok(BrandDetailResponse {
            products,
            alternatives,
        })
    })
    .await?;

    Ok(Json(Data::new(detail)))
}

pub async fn brand_alternatives(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let alternatives = with_session(&state, &ctx, move |session| {
        let brand = find_brand(session, id)?;
        brand_responses(session, brand.alternatives(session)?)
    })
    .await?;

    Ok(Json(Data::new(alternatives)))
}

pub async fn update_brand(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = Fields::new();
    if let Some(logo_url) = &req.logo_url {
        fields.url("logoUrl", logo_url);
    }
    fields.finish()?;

    let brand = with_session(&state, &ctx, move |session| {
        if let Some(category_id) = req.category_id {
            if !BrandCategory::exists(session, category_id)? {
                return Err(ApiError::invalid("categoryId"));
            }
        }

        let brand = session.save(BrandUpdate {
            id,
            logo_url: req.logo_url,
            category_id: req.category_id,
        })?;

        let categories = category_index::<BrandCategories>(session)?;
        brand_response(brand, &categories)
    })
    .await?;

    info!("User {} updated brand {}", claims.sub, brand.id);
    Ok(Json(Data::new(brand)))
}
