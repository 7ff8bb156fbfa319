//! Postgres-backed membership store and identity directory.
//!
//! ## Atomicity
//!
//! The three invariant-bearing conditions live in single statements, never
//! in engine-side read-then-write pairs:
//!
//! - `(company_id, user_id)` uniqueness is a database constraint; a `23505`
//!   violation surfaces as [`StoreError::DuplicateMember`].
//! - The owner-count condition on role changes and deletes is part of the
//!   `UPDATE`/`DELETE` predicate itself.
//! - Grant upserts write both booleans in one `ON CONFLICT .. DO UPDATE`.
//!
//! ## Schema
//!
//! The store expects the following tables (managed by the deployment's
//! migration tooling, external to this crate):
//!
//! ```sql
//! CREATE TABLE company_member (
//!     id          uuid PRIMARY KEY,
//!     company_id  uuid NOT NULL REFERENCES company(id) ON DELETE CASCADE,
//!     user_id     uuid NOT NULL,
//!     role        text NOT NULL,
//!     access_type text NOT NULL,
//!     invited_by  uuid,
//!     invited_at  timestamptz NOT NULL,
//!     created_at  timestamptz NOT NULL DEFAULT now(),
//!     UNIQUE (company_id, user_id)
//! );
//!
//! CREATE TABLE company_member_topic_access (
//!     id                uuid PRIMARY KEY,
//!     company_member_id uuid NOT NULL
//!         REFERENCES company_member(id) ON DELETE CASCADE,
//!     topic_id          uuid NOT NULL REFERENCES topic(id),
//!     can_view          boolean NOT NULL,
//!     can_edit          boolean NOT NULL,
//!     created_at        timestamptz NOT NULL DEFAULT now(),
//!     UNIQUE (company_member_id, topic_id)
//! );
//!
//! CREATE TABLE app_user (
//!     id                 uuid PRIMARY KEY,
//!     email              text NOT NULL UNIQUE,
//!     invited_at         timestamptz,
//!     invite_redirect_to text,
//!     confirmed_at       timestamptz
//! );
//! ```

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use disclose_access::identity::{IdentityError, IdentityProvider};
use disclose_access::store::{MembershipStore, StoreError};
use disclose_access::{
    AccessType, CompanyMember, MemberUpdate, NewMember, Role, TopicAccess, TopicGrant,
};
use disclose_core::{CompanyId, GrantId, MemberId, TopicId, UserId};

/// Postgres `company_member` / `company_member_topic_access` store.
///
/// The pool is cheap to clone and thread-safe; one store per process is the
/// normal wiring, handed to engines as `Arc<dyn MembershipStore>`.
#[derive(Debug, Clone)]
pub struct PostgresMembershipStore {
    pool: PgPool,
}

impl PostgresMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decode the text tags for role/scope; a tag this crate did not write is
/// treated as corruption, not as a permissive default.
fn parse_member_tags(role: &str, access_type: &str) -> Result<(Role, AccessType), StoreError> {
    let role: Role = role
        .parse()
        .map_err(|e| StoreError::Backend(anyhow!("corrupt role column: {e}")))?;
    let access_type: AccessType = access_type
        .parse()
        .map_err(|e| StoreError::Backend(anyhow!("corrupt access_type column: {e}")))?;
    Ok((role, access_type))
}

fn member_from_row(row: &PgRow) -> Result<CompanyMember, StoreError> {
    let role: String = row.try_get("role").map_err(backend)?;
    let access_type: String = row.try_get("access_type").map_err(backend)?;
    let (role, access_type) = parse_member_tags(&role, &access_type)?;

    Ok(CompanyMember {
        id: MemberId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
        company_id: CompanyId::from_uuid(row.try_get::<Uuid, _>("company_id").map_err(backend)?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(backend)?),
        role,
        access_type,
        invited_by: row
            .try_get::<Option<Uuid>, _>("invited_by")
            .map_err(backend)?
            .map(UserId::from_uuid),
        invited_at: row
            .try_get::<DateTime<Utc>, _>("invited_at")
            .map_err(backend)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(backend)?,
    })
}

fn grant_from_row(row: &PgRow) -> Result<TopicAccess, StoreError> {
    Ok(TopicAccess {
        id: GrantId::from_uuid(row.try_get::<Uuid, _>("id").map_err(backend)?),
        company_member_id: MemberId::from_uuid(
            row.try_get::<Uuid, _>("company_member_id").map_err(backend)?,
        ),
        topic_id: TopicId::from_uuid(row.try_get::<Uuid, _>("topic_id").map_err(backend)?),
        can_view: row.try_get("can_view").map_err(backend)?,
        can_edit: row.try_get("can_edit").map_err(backend)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(backend)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow!(err))
}

const MEMBER_COLUMNS: &str =
    "id, company_id, user_id, role, access_type, invited_by, invited_at, created_at";

const GRANT_COLUMNS: &str = "id, company_member_id, topic_id, can_view, can_edit, created_at";

#[async_trait]
impl MembershipStore for PostgresMembershipStore {
    async fn member_by_user(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<Option<CompanyMember>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM company_member WHERE company_id = $1 AND user_id = $2"
        ))
        .bind(company_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(member_from_row).transpose()
    }

    async fn member_by_id(&self, member_id: MemberId) -> Result<Option<CompanyMember>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM company_member WHERE id = $1"
        ))
        .bind(member_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(member_from_row).transpose()
    }

    async fn members_of_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CompanyMember>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM company_member \
             WHERE company_id = $1 ORDER BY created_at, id"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(member_from_row).collect()
    }

    async fn insert_member(&self, record: NewMember) -> Result<CompanyMember, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO company_member \
             (id, company_id, user_id, role, access_type, invited_by, invited_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(MemberId::new().as_uuid())
        .bind(record.company_id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(record.role.as_str())
        .bind(record.access_type.as_str())
        .bind(record.invited_by.map(|u| *u.as_uuid()))
        .bind(record.invited_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateMember
            } else {
                backend(e)
            }
        })?;

        member_from_row(&row)
    }

    async fn update_member(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<CompanyMember, StoreError> {
        // The owner-count condition is part of the UPDATE predicate, so two
        // concurrent demotions of the last owner cannot both pass it.
        let row = sqlx::query(&format!(
            "UPDATE company_member \
             SET role = COALESCE($2, role), access_type = COALESCE($3, access_type) \
             WHERE id = $1 \
               AND (COALESCE($2, role) = 'owner' \
                    OR role <> 'owner' \
                    OR EXISTS (SELECT 1 FROM company_member other \
                               WHERE other.company_id = company_member.company_id \
                                 AND other.id <> company_member.id \
                                 AND other.role = 'owner')) \
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(member_id.as_uuid())
        .bind(update.role.map(Role::as_str))
        .bind(update.access_type.map(AccessType::as_str))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => member_from_row(&row),
            None => {
                // Distinguish "no such member" from "guard refused".
                if self.member_by_id(member_id).await?.is_some() {
                    Err(StoreError::SoleOwner)
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }

    async fn delete_member(&self, member_id: MemberId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM company_member \
             WHERE id = $1 \
               AND (role <> 'owner' \
                    OR EXISTS (SELECT 1 FROM company_member other \
                               WHERE other.company_id = company_member.company_id \
                                 AND other.id <> company_member.id \
                                 AND other.role = 'owner'))",
        )
        .bind(member_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            if self.member_by_id(member_id).await?.is_some() {
                return Err(StoreError::SoleOwner);
            }
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<Option<TopicAccess>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM company_member_topic_access \
             WHERE company_member_id = $1 AND topic_id = $2"
        ))
        .bind(member_id.as_uuid())
        .bind(topic_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(grant_from_row).transpose()
    }

    async fn topic_grants_of_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<TopicAccess>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM company_member_topic_access \
             WHERE company_member_id = $1 ORDER BY created_at, id"
        ))
        .bind(member_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(grant_from_row).collect()
    }

    async fn upsert_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
        grant: TopicGrant,
    ) -> Result<TopicAccess, StoreError> {
        // Both booleans in one statement; a torn can_view/can_edit pair is
        // impossible at this layer.
        let row = sqlx::query(&format!(
            "INSERT INTO company_member_topic_access \
             (id, company_member_id, topic_id, can_view, can_edit) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (company_member_id, topic_id) \
             DO UPDATE SET can_view = EXCLUDED.can_view, can_edit = EXCLUDED.can_edit \
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(GrantId::new().as_uuid())
        .bind(member_id.as_uuid())
        .bind(topic_id.as_uuid())
        .bind(grant.can_view)
        .bind(grant.can_edit)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        grant_from_row(&row)
    }

    async fn delete_topic_grant(
        &self,
        member_id: MemberId,
        topic_id: TopicId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM company_member_topic_access \
             WHERE company_member_id = $1 AND topic_id = $2",
        )
        .bind(member_id.as_uuid())
        .bind(topic_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn topic_catalog(&self) -> Result<Vec<TopicId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM topic ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter()
            .map(|row| {
                Ok(TopicId::from_uuid(
                    row.try_get::<Uuid, _>("id").map_err(backend)?,
                ))
            })
            .collect()
    }
}

/// Postgres-backed identity directory.
///
/// Plays the identity platform's admin API against its own `app_user` table:
/// direct indexed lookup by email (exact match, as the platform records it)
/// and invitation issuance. Issuing an invitation records the unconfirmed
/// account and its redirect target; delivering the email belongs to the
/// platform's mailer, outside this crate.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PostgresDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, IdentityError> {
        let row = sqlx::query("SELECT id FROM app_user WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::Unavailable(anyhow!(e)))?;

        row.map(|row| {
            row.try_get::<Uuid, _>("id")
                .map(UserId::from_uuid)
                .map_err(|e| IdentityError::Unavailable(anyhow!(e)))
        })
        .transpose()
    }

    async fn invite_user_by_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<UserId, IdentityError> {
        let row = sqlx::query(
            "INSERT INTO app_user (id, email, invited_at, invite_redirect_to) \
             VALUES ($1, $2, now(), $3) \
             RETURNING id",
        )
        .bind(UserId::new().as_uuid())
        .bind(email)
        .bind(redirect_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                IdentityError::Rejected(format!("an account already exists for {email}"))
            } else {
                IdentityError::Unavailable(anyhow!(e))
            }
        })?;

        let user_id = row
            .try_get::<Uuid, _>("id")
            .map(UserId::from_uuid)
            .map_err(|e| IdentityError::Unavailable(anyhow!(e)))?;

        tracing::info!(redirect_to, "invitation recorded for delivery");
        Ok(user_id)
    }
}
