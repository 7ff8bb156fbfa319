//! Topic visibility routes for the caller's own session.
//!
//! Report/topic pages probe these before rendering; the answers come from
//! the engine, not from the static capability table.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use disclose_core::{CompanyId, TopicId};

use crate::app::dto::{AccessibleTopicsResponse, CallerRoleResponse, TopicPermissionsResponse};
use crate::app::{errors, AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/companies/:company_id/topics", get(accessible_topics))
        .route(
            "/companies/:company_id/topics/:topic_id/permissions",
            get(topic_permissions),
        )
        .route("/companies/:company_id/role", get(caller_role))
}

/// GET /companies/:company_id/topics — topic ids the caller may view.
pub async fn accessible_topics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(company_id): Path<CompanyId>,
) -> axum::response::Response {
    match services
        .engine()
        .accessible_topics(caller.user_id(), company_id)
        .await
    {
        Ok(topic_ids) => {
            (StatusCode::OK, Json(AccessibleTopicsResponse { topic_ids })).into_response()
        }
        Err(e) => errors::access_error_to_response(e),
    }
}

/// GET /companies/:company_id/topics/:topic_id/permissions
pub async fn topic_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path((company_id, topic_id)): Path<(CompanyId, TopicId)>,
) -> axum::response::Response {
    let engine = services.engine();

    let can_view = match engine
        .can_view_topic(caller.user_id(), company_id, topic_id)
        .await
    {
        Ok(v) => v,
        Err(e) => return errors::access_error_to_response(e),
    };
    let can_edit = match engine
        .can_edit_topic(caller.user_id(), company_id, topic_id)
        .await
    {
        Ok(v) => v,
        Err(e) => return errors::access_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(TopicPermissionsResponse { can_view, can_edit }),
    )
        .into_response()
}

/// GET /companies/:company_id/role — the caller's role and its static
/// capability record (UI reference data).
pub async fn caller_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(company_id): Path<CompanyId>,
) -> axum::response::Response {
    match services
        .engine()
        .resolve_role(caller.user_id(), company_id)
        .await
    {
        Ok(role) => (
            StatusCode::OK,
            Json(CallerRoleResponse {
                role,
                capabilities: role.map(|r| r.capabilities()),
            }),
        )
            .into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}
