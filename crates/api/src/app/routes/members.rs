//! Membership-management routes.
//!
//! Every route re-checks the caller's `can_manage_members` against the
//! target member's company; member ids arriving in the path are not trusted
//! to belong to a company the caller administers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use disclose_access::{AccessError, CompanyMember};
use disclose_core::{CompanyId, MemberId, TopicId};

use crate::app::dto::{
    AddMemberRequest, AddMemberResponse, MemberResponse, MembersResponse, SetTopicAccessRequest,
    TopicAccessResponse,
};
use crate::app::{errors, AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/companies/:company_id/members",
            get(list_members).post(add_member),
        )
        .route(
            "/members/:member_id",
            axum::routing::patch(update_member).delete(remove_member),
        )
        .route(
            "/members/:member_id/topic-access/:topic_id",
            put(set_topic_access).delete(remove_topic_access),
        )
}

/// GET /companies/:company_id/members — members joined with topic grants.
pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(company_id): Path<CompanyId>,
) -> axum::response::Response {
    match manage_members_gate(&services, &caller, company_id).await {
        Ok(()) => {}
        Err(response) => return response,
    }

    match services.engine().members_with_access(company_id).await {
        Ok(members) => (StatusCode::OK, Json(MembersResponse { members })).into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

/// POST /companies/:company_id/members — invite or directly add a member.
pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(company_id): Path<CompanyId>,
    Json(body): Json<AddMemberRequest>,
) -> axum::response::Response {
    // The provisioning flow performs the capability check itself, before
    // touching the admin-privileged directory.
    match services
        .provisioning()
        .add_member(
            company_id,
            caller.user_id(),
            &body.email,
            body.role,
            body.access_type,
        )
        .await
    {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(AddMemberResponse {
                member: outcome.member,
                invited: outcome.invited,
            }),
        )
            .into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

/// PATCH /members/:member_id — change role and/or access scope.
pub async fn update_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(member_id): Path<MemberId>,
    Json(update): Json<disclose_access::MemberUpdate>,
) -> axum::response::Response {
    let target = match target_member_gate(&services, &caller, member_id).await {
        Ok(member) => member,
        Err(response) => return response,
    };

    match services.engine().update_member(target.id, update).await {
        Ok(member) => (StatusCode::OK, Json(MemberResponse { member })).into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

/// DELETE /members/:member_id
pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(member_id): Path<MemberId>,
) -> axum::response::Response {
    let target = match target_member_gate(&services, &caller, member_id).await {
        Ok(member) => member,
        Err(response) => return response,
    };

    match services.engine().remove_member(target.id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

/// PUT /members/:member_id/topic-access/:topic_id
pub async fn set_topic_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path((member_id, topic_id)): Path<(MemberId, TopicId)>,
    Json(body): Json<SetTopicAccessRequest>,
) -> axum::response::Response {
    let target = match target_member_gate(&services, &caller, member_id).await {
        Ok(member) => member,
        Err(response) => return response,
    };

    match services
        .engine()
        .set_topic_access(target.id, topic_id, body.can_view, body.can_edit)
        .await
    {
        Ok(topic_access) => {
            (StatusCode::OK, Json(TopicAccessResponse { topic_access })).into_response()
        }
        Err(e) => errors::access_error_to_response(e),
    }
}

/// DELETE /members/:member_id/topic-access/:topic_id
pub async fn remove_topic_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path((member_id, topic_id)): Path<(MemberId, TopicId)>,
) -> axum::response::Response {
    let target = match target_member_gate(&services, &caller, member_id).await {
        Ok(member) => member,
        Err(response) => return response,
    };

    match services
        .engine()
        .remove_topic_access(target.id, topic_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}

/// Caller must administer the given company.
async fn manage_members_gate(
    services: &AppServices,
    caller: &CallerContext,
    company_id: CompanyId,
) -> Result<(), axum::response::Response> {
    match services
        .engine()
        .can_manage_members(caller.user_id(), company_id)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => Err(errors::access_error_to_response(AccessError::NotAuthorized)),
        Err(e) => Err(errors::access_error_to_response(e)),
    }
}

/// Resolve the target member, then require the caller to administer the
/// member's company.
async fn target_member_gate(
    services: &AppServices,
    caller: &CallerContext,
    member_id: MemberId,
) -> Result<CompanyMember, axum::response::Response> {
    let member = match services.engine().member_by_id(member_id).await {
        Ok(Some(member)) => member,
        Ok(None) => return Err(errors::access_error_to_response(AccessError::NotFound)),
        Err(e) => return Err(errors::access_error_to_response(e)),
    };

    manage_members_gate(services, caller, member.company_id).await?;
    Ok(member)
}
