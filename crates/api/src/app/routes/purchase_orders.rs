use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_core::PurchaseOrderId;
use stockdesk_purchasing::{NewPurchaseOrder, PurchaseOrderPatch};

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route(
            "/:id",
            get(get_purchase_order)
                .patch(update_purchase_order)
                .delete(delete_purchase_order),
        )
        .route("/:id/receive", post(receive_purchase_order))
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PurchaseOrderListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.purchase_orders.list(&filter, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.purchase_orders.get(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewPurchaseOrder>,
) -> axum::response::Response {
    match services.purchase_orders.create(body, ctx.identity()).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<PurchaseOrderPatch>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .purchase_orders
        .update(id, body, ctx.identity())
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn receive_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReceiveRequest>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .purchase_orders
        .receive(id, body.warehouse_id, body.items, ctx.identity())
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.purchase_orders.delete(id, ctx.identity()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::hard(*id.as_uuid())),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
