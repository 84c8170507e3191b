//! Supplier persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::supplier::{self, NewSupplier, Supplier, SupplierPatch};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{DomainError, DomainResult, Identity, Page, PageQuery, SupplierId};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Clone)]
pub struct SupplierStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    code: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: SupplierId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, code, name, email, phone, is_active, created_at, updated_at";

impl SupplierStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        is_active: Option<bool>,
        page: PageQuery,
    ) -> DomainResult<Page<Supplier>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM suppliers WHERE ($1::boolean IS NULL OR is_active = $1)",
        )
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.count", e))?;

        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {COLUMNS} FROM suppliers WHERE ($1::boolean IS NULL OR is_active = $1) \
             ORDER BY code, id LIMIT $2 OFFSET $3"
        ))
        .bind(is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.list", e))?;

        let data = rows.into_iter().map(Supplier::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: SupplierId) -> DomainResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.get", e))?;

        row.map(Supplier::from)
            .ok_or_else(|| DomainError::not_found("supplier"))
    }

    pub async fn create(&self, new: NewSupplier, identity: &Identity) -> DomainResult<Supplier> {
        new.validate()?;
        let supplier = new.into_supplier(SupplierId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO suppliers (id, code, name, email, phone, is_active, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(supplier.id.as_uuid())
        .bind(&supplier.code)
        .bind(&supplier.name)
        .bind(supplier.email.as_deref())
        .bind(supplier.phone.as_deref())
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Supplier,
                *supplier.id.as_uuid(),
                ChangeSet::created(&supplier),
            ))
            .await;
        Ok(supplier)
    }

    pub async fn update(
        &self,
        id: SupplierId,
        patch: SupplierPatch,
        identity: &Identity,
    ) -> DomainResult<Supplier> {
        patch.validate()?;
        let before = self.get(id).await?;
        let mut supplier = before.clone();
        patch.apply(&mut supplier, Utc::now());

        sqlx::query(
            "UPDATE suppliers SET code = $2, name = $3, email = $4, phone = $5, is_active = $6, \
             updated_at = $7 WHERE id = $1",
        )
        .bind(supplier.id.as_uuid())
        .bind(&supplier.code)
        .bind(&supplier.name)
        .bind(supplier.email.as_deref())
        .bind(supplier.phone.as_deref())
        .bind(supplier.is_active)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Supplier,
                *supplier.id.as_uuid(),
                ChangeSet::updated(&before, &supplier),
            ))
            .await;
        Ok(supplier)
    }

    pub async fn delete(&self, id: SupplierId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;

        let purchase_order_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_orders WHERE supplier_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers.delete", e))?;

        let outcome = supplier::delete_outcome(purchase_order_count);
        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query("UPDATE suppliers SET is_active = FALSE, updated_at = $2 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(after.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("suppliers.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                sqlx::query("DELETE FROM suppliers WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("suppliers.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Supplier,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }
}
