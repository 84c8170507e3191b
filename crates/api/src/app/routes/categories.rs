use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_catalog::{CategoryPatch, NewCategory};
use stockdesk_core::CategoryId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route(
            "/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::CategoryListQuery>,
) -> axum::response::Response {
    let (parent_id, page) = query.split();
    match services.categories.list(parent_id, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.categories.get(id).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewCategory>,
) -> axum::response::Response {
    match services.categories.create(body, ctx.identity()).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<CategoryPatch>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.categories.update(id, body, ctx.identity()).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.categories.delete(id, ctx.identity()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::from_outcome(*id.as_uuid(), outcome)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
