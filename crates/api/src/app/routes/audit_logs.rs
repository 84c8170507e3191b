use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockdesk_core::AuditLogId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/:id", get(get_audit_log))
}

pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AuditListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.audit.list(&filter, page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_audit_log(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AuditLogId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.audit.get(id).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
