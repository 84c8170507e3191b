use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_catalog::{NewWarehouse, WarehousePatch};
use stockdesk_core::WarehouseId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_warehouse).get(list_warehouses))
        .route(
            "/:id",
            get(get_warehouse)
                .patch(update_warehouse)
                .delete(delete_warehouse),
        )
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::WarehouseListQuery>,
) -> axum::response::Response {
    let (organization_id, page) = query.split();
    match services.warehouses.list(organization_id, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WarehouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.warehouses.get(id).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewWarehouse>,
) -> axum::response::Response {
    match services.warehouses.create(body, ctx.identity()).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<WarehousePatch>,
) -> axum::response::Response {
    let id: WarehouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.warehouses.update(id, body, ctx.identity()).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WarehouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.warehouses.delete(id, ctx.identity()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::from_outcome(*id.as_uuid(), outcome)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
