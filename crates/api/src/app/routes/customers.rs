use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_catalog::{CustomerPatch, NewCustomer};
use stockdesk_core::CustomerId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route(
            "/:id",
            get(get_customer).patch(update_customer).delete(delete_customer),
        )
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ActiveListQuery>,
) -> axum::response::Response {
    let (is_active, page) = query.split();
    match services.customers.list(is_active, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.customers.get(id).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewCustomer>,
) -> axum::response::Response {
    match services.customers.create(body, ctx.identity()).await {
        Ok(customer) => (StatusCode::CREATED, Json(customer)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<CustomerPatch>,
) -> axum::response::Response {
    let id: CustomerId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.customers.update(id, body, ctx.identity()).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.customers.delete(id, ctx.identity()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::from_outcome(*id.as_uuid(), outcome)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
