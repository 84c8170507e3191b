//! Organization persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::organization::{self, NewOrganization, Organization, OrganizationPatch};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{DomainError, DomainResult, Identity, OrganizationId, Page, PageQuery};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Clone)]
pub struct OrganizationStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    slug: String,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: OrganizationId::from_uuid(row.id),
            slug: row.slug,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, slug, name, is_active, created_at, updated_at";

impl OrganizationStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(&self, page: PageQuery) -> DomainResult<Page<Organization>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("organizations.count", e))?;

        let rows = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {COLUMNS} FROM organizations ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.list", e))?;

        let data = rows.into_iter().map(Organization::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: OrganizationId) -> DomainResult<Organization> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {COLUMNS} FROM organizations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.get", e))?;

        row.map(Organization::from)
            .ok_or_else(|| DomainError::not_found("organization"))
    }

    pub async fn create(
        &self,
        new: NewOrganization,
        identity: &Identity,
    ) -> DomainResult<Organization> {
        new.validate()?;
        let organization = new.into_organization(OrganizationId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO organizations (id, slug, name, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.slug)
        .bind(&organization.name)
        .bind(organization.is_active)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Organization,
                *organization.id.as_uuid(),
                ChangeSet::created(&organization),
            ))
            .await;
        Ok(organization)
    }

    pub async fn update(
        &self,
        id: OrganizationId,
        patch: OrganizationPatch,
        identity: &Identity,
    ) -> DomainResult<Organization> {
        patch.validate()?;
        let before = self.get(id).await?;
        let mut organization = before.clone();
        patch.apply(&mut organization, Utc::now());

        sqlx::query(
            "UPDATE organizations SET slug = $2, name = $3, is_active = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.slug)
        .bind(&organization.name)
        .bind(organization.is_active)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Organization,
                *organization.id.as_uuid(),
                ChangeSet::updated(&before, &organization),
            ))
            .await;
        Ok(organization)
    }

    /// Hard-delete when nothing references the organization, otherwise
    /// deactivate it in place.
    pub async fn delete(&self, id: OrganizationId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;

        let product_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE organization_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.delete", e))?;
        let warehouse_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE organization_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("organizations.delete", e))?;

        let outcome = organization::delete_outcome(product_count, warehouse_count);
        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query(
                    "UPDATE organizations SET is_active = FALSE, updated_at = $2 WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(after.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("organizations.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                sqlx::query("DELETE FROM organizations WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("organizations.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Organization,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }
}
