//! Pure topic-permission policy.
//!
//! The engine resolves the membership and grant rows from the store and
//! applies these decision functions. Keeping them free of IO makes the
//! decision trees exhaustively testable without a store.
//!
//! - No IO
//! - No panics
//! - Fail closed: an absent grant row is "no access", never "access granted"

use crate::{AccessType, CompanyMember, Role, TopicAccess};

/// Decision tree for viewing a topic.
///
/// 1. Owner/admin: unconditional.
/// 2. `access_type = all`: unconditional.
/// 3. Otherwise: the grant row decides; absence means no access.
pub fn can_view_topic(member: &CompanyMember, grant: Option<&TopicAccess>) -> bool {
    if member.role.is_administrative() {
        return true;
    }
    if member.access_type == AccessType::All {
        return true;
    }
    grant.is_some_and(|g| g.can_view)
}

/// Decision tree for editing a topic.
///
/// The viewer veto is checked before access scope: scope governs the reach
/// of an already-permitted action class, not whether the class is permitted
/// at all, so a viewer can never edit regardless of `access_type` or any
/// grant row.
pub fn can_edit_topic(member: &CompanyMember, grant: Option<&TopicAccess>) -> bool {
    match member.role {
        Role::Viewer => false,
        Role::Owner | Role::Admin => true,
        Role::Editor => match member.access_type {
            AccessType::All => true,
            AccessType::Selected => grant.is_some_and(|g| g.can_edit),
        },
    }
}
