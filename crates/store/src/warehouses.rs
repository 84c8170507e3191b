//! Warehouse persistence.
//!
//! Setting a warehouse as the organization default clears the previous
//! default inside the same transaction; a partial unique index keeps the
//! "one default per organization" rule honest under races.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::warehouse::{self, NewWarehouse, Warehouse, WarehousePatch};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{
    DomainError, DomainResult, Identity, OrganizationId, Page, PageQuery, WarehouseId,
};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Clone)]
pub struct WarehouseStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct WarehouseRow {
    id: Uuid,
    code: String,
    name: String,
    organization_id: Uuid,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Self {
            id: WarehouseId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            organization_id: OrganizationId::from_uuid(row.organization_id),
            is_default: row.is_default,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, code, name, organization_id, is_default, is_active, created_at, updated_at";

impl WarehouseStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        organization_id: Option<OrganizationId>,
        page: PageQuery,
    ) -> DomainResult<Page<Warehouse>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);
        let organization = organization_id.map(|o| *o.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE ($1::uuid IS NULL OR organization_id = $1)",
        )
        .bind(organization)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouses.count", e))?;

        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {COLUMNS} FROM warehouses \
             WHERE ($1::uuid IS NULL OR organization_id = $1) \
             ORDER BY code, id LIMIT $2 OFFSET $3"
        ))
        .bind(organization)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouses.list", e))?;

        let data = rows.into_iter().map(Warehouse::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouses.get", e))?;

        row.map(Warehouse::from)
            .ok_or_else(|| DomainError::not_found("warehouse"))
    }

    pub async fn create(&self, new: NewWarehouse, identity: &Identity) -> DomainResult<Warehouse> {
        new.validate()?;
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)",
        )
        .bind(new.organization_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouses.create", e))?;
        if !exists {
            return Err(DomainError::not_found("organization"));
        }

        let warehouse = new.into_warehouse(WarehouseId::new(), Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("warehouses.create", e))?;
        if warehouse.is_default {
            self.clear_default(&mut tx, warehouse.organization_id, warehouse.updated_at)
                .await?;
        }
        sqlx::query(
            "INSERT INTO warehouses (id, code, name, organization_id, is_default, is_active, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.code)
        .bind(&warehouse.name)
        .bind(warehouse.organization_id.as_uuid())
        .bind(warehouse.is_default)
        .bind(warehouse.is_active)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("warehouses.create", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("warehouses.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Warehouse,
                *warehouse.id.as_uuid(),
                ChangeSet::created(&warehouse),
            ))
            .await;
        Ok(warehouse)
    }

    pub async fn update(
        &self,
        id: WarehouseId,
        patch: WarehousePatch,
        identity: &Identity,
    ) -> DomainResult<Warehouse> {
        patch.validate()?;
        let before = self.get(id).await?;
        let mut warehouse = before.clone();
        patch.apply(&mut warehouse, Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("warehouses.update", e))?;
        if warehouse.is_default && !before.is_default {
            self.clear_default(&mut tx, warehouse.organization_id, warehouse.updated_at)
                .await?;
        }
        sqlx::query(
            "UPDATE warehouses SET code = $2, name = $3, is_default = $4, is_active = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.code)
        .bind(&warehouse.name)
        .bind(warehouse.is_default)
        .bind(warehouse.is_active)
        .bind(warehouse.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("warehouses.update", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("warehouses.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Warehouse,
                *warehouse.id.as_uuid(),
                ChangeSet::updated(&before, &warehouse),
            ))
            .await;
        Ok(warehouse)
    }

    pub async fn delete(&self, id: WarehouseId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;

        let stock_row_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_items WHERE warehouse_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouses.delete", e))?;

        let outcome = warehouse::delete_outcome(stock_row_count);
        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query(
                    "UPDATE warehouses SET is_active = FALSE, updated_at = $2 WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(after.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("warehouses.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                sqlx::query("DELETE FROM warehouses WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("warehouses.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Warehouse,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }

    async fn clear_default(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        sqlx::query(
            "UPDATE warehouses SET is_default = FALSE, updated_at = $2 \
             WHERE organization_id = $1 AND is_default",
        )
        .bind(organization_id.as_uuid())
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("warehouses.clear_default", e))?;
        Ok(())
    }
}
