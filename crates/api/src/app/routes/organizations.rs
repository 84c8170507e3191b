use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockdesk_catalog::{NewOrganization, OrganizationPatch};
use stockdesk_core::{OrganizationId, PageQuery};

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route(
            "/:id",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(page): Query<PageQuery>,
) -> axum::response::Response {
    match services.organizations.list(page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrganizationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.organizations.get(id).await {
        Ok(organization) => (StatusCode::OK, Json(organization)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewOrganization>,
) -> axum::response::Response {
    match services.organizations.create(body, ctx.identity()).await {
        Ok(organization) => (StatusCode::CREATED, Json(organization)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<OrganizationPatch>,
) -> axum::response::Response {
    let id: OrganizationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.organizations.update(id, body, ctx.identity()).await {
        Ok(organization) => (StatusCode::OK, Json(organization)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrganizationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.organizations.delete(id, ctx.identity()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::DeleteResponse::from_outcome(*id.as_uuid(), outcome)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
