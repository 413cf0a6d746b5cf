use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{error, info};

use nop_db::models::{
    BrandCategories, CampaignCategories, Category, CategoryKind, CategoryTable, NewCategory,
    ProductCategories,
};
use nop_db::{DbError, Record, RequestContext, Session};
use nop_types::api::{CategoryResponse, CreateCategoryRequest, Data};

use crate::auth::AppState;
use crate::context::with_session;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Claims;
use crate::validation::Fields;

const NAME_MAX_CHARS: usize = 32;

fn parse_kind(raw: &str) -> Result<CategoryKind, ApiError> {
    raw.parse().map_err(|_| {
        let kinds: Vec<_> = CategoryKind::ALL.iter().map(|k| k.as_str()).collect();
        ApiError::BadRequest(format!("Category kind must be one of: {}", kinds.join(", ")))
    })
}

pub(crate) fn category_response<K>(category: Category<K>) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name,
    }
}

/// All categories of one kind keyed by id, for joining onto listings.
pub(crate) fn category_index<K: CategoryTable>(
    session: &Session,
) -> Result<HashMap<i64, CategoryResponse>, DbError> {
    Ok(Category::<K>::get_all(session, None, &[])?
        .into_iter()
        .map(|c| (c.id, category_response(c)))
        .collect())
}

pub(crate) fn lookup_category(
    index: &HashMap<i64, CategoryResponse>,
    id: i64,
) -> Result<CategoryResponse, ApiError> {
    index.get(&id).cloned().ok_or_else(|| {
        error!("Dangling category reference {}", id);
        ApiError::Internal
    })
}

fn list_of<K: CategoryTable>(session: &Session) -> Result<Vec<CategoryResponse>, DbError> {
    let categories = Category::<K>::get_all(session, None, &[Category::<K>::ID.asc()])?;
    Ok(categories.into_iter().map(category_response).collect())
}

fn get_of<K: CategoryTable>(session: &Session, id: i64) -> Result<CategoryResponse, ApiError> {
    Category::<K>::get_one(session, Some(&Category::<K>::ID.eq(id)), &[], || {
        ApiError::NotFound(format!("{} category {} not found", K::KIND, id))
    })
    .map(category_response)
}

fn create_of<K: CategoryTable>(session: &Session, name: String) -> Result<CategoryResponse, DbError> {
    session.save(NewCategory::<K>::new(name)).map(category_response)
}

pub async fn list_categories(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;

    let categories = with_session(&state, &ctx, move |session| {
        let categories = match kind {
            CategoryKind::Brand => list_of::<BrandCategories>(session)?,
            CategoryKind::Product => list_of::<ProductCategories>(session)?,
            CategoryKind::Campaign => list_of::<CampaignCategories>(session)?,
        };
        Ok(categories)
    })
    .await?;

    Ok(Json(Data::new(categories)))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;

    let category = with_session(&state, &ctx, move |session| match kind {
        CategoryKind::Brand => get_of::<BrandCategories>(session, id),
        CategoryKind::Product => get_of::<ProductCategories>(session, id),
        CategoryKind::Campaign => get_of::<CampaignCategories>(session, id),
    })
    .await?;

    Ok(Json(Data::new(category)))
}

pub async fn create_category(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;

    let mut fields = Fields::new();
    fields.text("name", &req.name, NAME_MAX_CHARS);
    fields.finish()?;

    let category = with_session(&state, &ctx, move |session| {
        let category = match kind {
            CategoryKind::Brand => create_of::<BrandCategories>(session, req.name)?,
            CategoryKind::Product => create_of::<ProductCategories>(session, req.name)?,
            CategoryKind::Campaign => create_of::<CampaignCategories>(session, req.name)?,
        };
        Ok(category)
    })
    .await?;

    info!("User {} created {} category {}", claims.sub, kind, category.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/categories/{}/{}", kind, category.id))],
        Json(Data::new(category)),
    ))
}
