//! `disclose-access` — authorization core for the disclosure platform
//! (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: stores and
//! the identity platform enter through collaborator traits, and the decision
//! trees themselves are pure functions in [`policy`].

pub mod capabilities;
pub mod engine;
pub mod error;
pub mod identity;
pub mod member;
pub mod memory;
pub mod policy;
pub mod provisioning;
pub mod role;
pub mod store;

pub use capabilities::RoleCapabilities;
pub use engine::AccessEngine;
pub use error::AccessError;
pub use identity::{IdentityError, IdentityProvider};
pub use member::{
    CompanyMember, MemberUpdate, MemberWithTopicAccess, NewMember, TopicAccess, TopicGrant,
};
pub use memory::{InMemoryDirectory, InMemoryMembershipStore};
pub use provisioning::{MemberProvisioning, ProvisionedMember};
pub use role::{AccessType, Role};
pub use store::{MembershipStore, StoreError};
