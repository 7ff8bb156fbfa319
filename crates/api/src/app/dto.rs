//! Request/response bodies for the membership-management surface.

use serde::{Deserialize, Serialize};

use disclose_access::{
    AccessType, CompanyMember, MemberWithTopicAccess, Role, RoleCapabilities, TopicAccess,
};
use disclose_core::TopicId;

fn default_access_type() -> AccessType {
    AccessType::All
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Role,
    #[serde(default = "default_access_type")]
    pub access_type: AccessType,
}

#[derive(Debug, Serialize)]
pub struct AddMemberResponse {
    pub member: CompanyMember,
    /// Whether an invitation email was issued ("invitation sent") as opposed
    /// to an existing account being enrolled ("member added").
    pub invited: bool,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberWithTopicAccess>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: CompanyMember,
}

#[derive(Debug, Deserialize)]
pub struct SetTopicAccessRequest {
    pub can_view: bool,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct TopicAccessResponse {
    pub topic_access: TopicAccess,
}

#[derive(Debug, Serialize)]
pub struct TopicPermissionsResponse {
    pub can_view: bool,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessibleTopicsResponse {
    pub topic_ids: Vec<TopicId>,
}

#[derive(Debug, Serialize)]
pub struct CallerRoleResponse {
    pub role: Option<Role>,
    /// Static capability record for the role; UI reference data only, the
    /// per-topic endpoints are authoritative.
    pub capabilities: Option<RoleCapabilities>,
}
