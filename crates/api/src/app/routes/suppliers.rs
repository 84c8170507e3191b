use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_catalog::{NewSupplier, SupplierPatch};
use stockdesk_core::SupplierId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_supplier).get(list_suppliers))
        .route(
            "/:id",
            get(get_supplier).patch(update_supplier).delete(delete_supplier),
        )
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ActiveListQuery>,
) -> axum::response::Response {
    let (is_active, page) = query.split();
    match services.suppliers.list(is_active, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplierId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.suppliers.get(id).await {
        Ok(supplier) => (StatusCode::OK, Json(supplier)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewSupplier>,
) -> axum::response::Response {
    match services.suppliers.create(body, ctx.identity()).await {
        Ok(supplier) => (StatusCode::CREATED, Json(supplier)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<SupplierPatch>,
) -> axum::response::Response {
    let id: SupplierId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.suppliers.update(id, body, ctx.identity()).await {
        Ok(supplier) => (StatusCode::OK, Json(supplier)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplierId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.suppliers.delete(id, ctx.identity()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::from_outcome(*id.as_uuid(), outcome)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
