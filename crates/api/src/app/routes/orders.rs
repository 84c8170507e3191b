use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_core::OrderId;
use stockdesk_sales::NewOrder;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route(
            "/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::OrderListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.orders.list(&filter, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.get(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewOrder>,
) -> axum::response::Response {
    match services.orders.create(body, ctx.identity()).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::OrderUpdateRequest>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.orders.update(id, patch, ctx.identity()).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders.delete(id, ctx.identity()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::hard(*id.as_uuid())),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
