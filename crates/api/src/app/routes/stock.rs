use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use stockdesk_core::{ProductId, WarehouseId};

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stock))
        .route("/bulk", post(bulk_update_stock))
        .route("/:product_id/:warehouse_id", get(get_stock).put(update_stock))
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::StockListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.stock.list(&filter, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((product_id, warehouse_id)): Path<(String, String)>,
) -> axum::response::Response {
    let product_id: ProductId = match parse_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id: WarehouseId = match parse_id(&warehouse_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.stock.get(product_id, warehouse_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((product_id, warehouse_id)): Path<(String, String)>,
    Json(body): Json<dto::StockWriteRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match parse_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let warehouse_id: WarehouseId = match parse_id(&warehouse_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let write = match body.into_write() {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .stock
        .write(product_id, warehouse_id, write, ctx.identity())
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn bulk_update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::BulkStockRequest>,
) -> axum::response::Response {
    let writes = match body.into_writes() {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.stock.bulk_write(&writes, ctx.identity()).await {
        Ok(results) => {
            let lines: Vec<_> = results.iter().map(dto::bulk_result_to_json).collect();
            (StatusCode::OK, Json(json!({ "results": lines }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
