//! Static role capability table.
//!
//! Descriptive reference data for UI layers ("what can this role generally
//! do"). The "all topics" entries are `false` for editor and viewer because
//! those capabilities are conditional on the member's access scope, which a
//! static table cannot express. The engine computes the authoritative
//! answer; callers must not authorize against this table alone.

use serde::Serialize;

use crate::Role;

/// Fixed capability record for a role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCapabilities {
    pub can_manage_members: bool,
    pub can_manage_topic_access: bool,
    pub can_edit_all_topics: bool,
    pub can_view_all_topics: bool,
    pub can_delete_company: bool,
    pub can_create_reports: bool,
}

impl Role {
    /// Static capability record for this role.
    pub const fn capabilities(self) -> RoleCapabilities {
        match self {
            Role::Owner => RoleCapabilities {
                can_manage_members: true,
                can_manage_topic_access: true,
                can_edit_all_topics: true,
                can_view_all_topics: true,
                can_delete_company: true,
                can_create_reports: true,
            },
            Role::Admin => RoleCapabilities {
                can_manage_members: true,
                can_manage_topic_access: true,
                can_edit_all_topics: true,
                can_view_all_topics: true,
                can_delete_company: false,
                can_create_reports: true,
            },
            // Topic scope for editors depends on access_type, so the "all
            // topics" entries stay false here.
            Role::Editor => RoleCapabilities {
                can_manage_members: false,
                can_manage_topic_access: false,
                can_edit_all_topics: false,
                can_view_all_topics: false,
                can_delete_company: false,
                can_create_reports: true,
            },
            Role::Viewer => RoleCapabilities {
                can_manage_members: false,
                can_manage_topic_access: false,
                can_edit_all_topics: false,
                can_view_all_topics: false,
                can_delete_company: false,
                can_create_reports: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_can_delete_company() {
        assert!(Role::Owner.capabilities().can_delete_company);
        assert!(!Role::Admin.capabilities().can_delete_company);
        assert!(!Role::Editor.capabilities().can_delete_company);
        assert!(!Role::Viewer.capabilities().can_delete_company);
    }

    #[test]
    fn member_management_matches_administrative_roles() {
        for role in [Role::Owner, Role::Admin, Role::Editor, Role::Viewer] {
            assert_eq!(
                role.capabilities().can_manage_members,
                role.is_administrative()
            );
            assert_eq!(
                role.capabilities().can_manage_topic_access,
                role.is_administrative()
            );
        }
    }

    #[test]
    fn viewer_cannot_create_reports() {
        assert!(!Role::Viewer.capabilities().can_create_reports);
        assert!(Role::Editor.capabilities().can_create_reports);
    }
}
