//! Stock ledger persistence.
//!
//! One row per (product, warehouse). Reads fall back to a zero record when
//! no row exists; writes lock the row (`FOR UPDATE`), apply the requested
//! change in the domain and upsert the result, so concurrent writers
//! serialize per cell instead of clobbering each other.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_core::{
    DomainError, DomainResult, Identity, Page, PageQuery, ProductId, WarehouseId,
};
use stockdesk_stock::{StockLevel, StockWrite};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;

/// Highest page size the stock listing will serve.
pub const MAX_STOCK_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, Default)]
pub struct StockFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
}

/// One ledger cell as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub reserved_qty: i64,
    pub available_qty: i64,
    pub last_count_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockRecord {
    /// The record reported for a cell that has never been written.
    fn zero(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            warehouse_id,
            quantity: 0,
            reserved_qty: 0,
            available_qty: 0,
            last_count_at: None,
            updated_at: None,
        }
    }

    fn from_level(
        product_id: ProductId,
        warehouse_id: WarehouseId,
        level: StockLevel,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            warehouse_id,
            quantity: level.quantity,
            reserved_qty: level.reserved_qty,
            available_qty: level.available(),
            last_count_at: level.last_count_at,
            updated_at: Some(updated_at),
        }
    }
}

/// One item of a bulk write request.
#[derive(Debug, Clone, Copy)]
pub struct BulkStockWrite {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub write: StockWrite,
}

/// Per-item bulk outcome; one item failing validation does not fail the
/// batch.
#[derive(Debug)]
pub struct BulkStockResult {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub result: DomainResult<StockRecord>,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i64,
    reserved_qty: i64,
    available_qty: i64,
    last_count_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for StockRecord {
    fn from(row: StockRow) -> Self {
        Self {
            product_id: ProductId::from_uuid(row.product_id),
            warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
            quantity: row.quantity,
            reserved_qty: row.reserved_qty,
            available_qty: row.available_qty,
            last_count_at: row.last_count_at,
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct StockStore {
    pool: PgPool,
    audit: AuditStore,
}

impl StockStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        filter: &StockFilter,
        page: PageQuery,
    ) -> DomainResult<Page<StockRecord>> {
        let (limit, offset) = page.resolve(MAX_STOCK_LIMIT);
        let product = filter.product_id.map(|p| *p.as_uuid());
        let warehouse = filter.warehouse_id.map(|w| *w.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_items
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            "#,
        )
        .bind(product)
        .bind(warehouse)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock.count", e))?;

        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT product_id, warehouse_id, quantity, reserved_qty, available_qty,
                   last_count_at, updated_at
            FROM stock_items
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            ORDER BY product_id, warehouse_id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(product)
        .bind(warehouse)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock.list", e))?;

        let data = rows.into_iter().map(StockRecord::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    /// Read one cell; a cell that has never been written reads as zero.
    pub async fn get(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<StockRecord> {
        self.ensure_refs(product_id, warehouse_id).await?;

        let row = sqlx::query_as::<_, StockRow>(
            "SELECT product_id, warehouse_id, quantity, reserved_qty, available_qty, \
             last_count_at, updated_at \
             FROM stock_items WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock.get", e))?;

        Ok(row
            .map(StockRecord::from)
            .unwrap_or_else(|| StockRecord::zero(product_id, warehouse_id)))
    }

    /// Apply one write.
    pub async fn write(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        write: StockWrite,
        identity: &Identity,
    ) -> DomainResult<StockRecord> {
        self.ensure_refs(product_id, warehouse_id).await?;
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("stock.write", e))?;
        let (row_id, before, after) =
            apply_write(&mut tx, product_id, warehouse_id, write, now).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("stock.write", e))?;

        self.audit_write(identity, row_id, &before, &after).await;
        Ok(StockRecord::from_level(product_id, warehouse_id, after, now))
    }

    /// Apply many writes in one transaction.
    ///
    /// Validation failures (bad quantities, unknown references) are reported
    /// per item and do not roll back the others; only infrastructure
    /// failures abort the whole batch. Each item runs inside its own
    /// savepoint so a statement that fails at the database (e.g. a foreign
    /// key raced away) does not abort the enclosing transaction.
    pub async fn bulk_write(
        &self,
        writes: &[BulkStockWrite],
        identity: &Identity,
    ) -> DomainResult<Vec<BulkStockResult>> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("stock.bulk_write", e))?;

        let mut results = Vec::with_capacity(writes.len());
        let mut audits = Vec::new();

        for item in writes {
            let mut sp = tx
                .begin()
                .await
                .map_err(|e| map_sqlx_error("stock.bulk_write", e))?;

            let applied = match self
                .ensure_refs_in_tx(&mut sp, item.product_id, item.warehouse_id)
                .await
            {
                Ok(()) => {
                    apply_write(&mut sp, item.product_id, item.warehouse_id, item.write, now).await
                }
                Err(e) => Err(e),
            };

            match applied {
                Ok((row_id, before, after)) => {
                    sp.commit()
                        .await
                        .map_err(|e| map_sqlx_error("stock.bulk_write", e))?;
                    audits.push((row_id, before, after));
                    results.push(BulkStockResult {
                        product_id: item.product_id,
                        warehouse_id: item.warehouse_id,
                        result: Ok(StockRecord::from_level(
                            item.product_id,
                            item.warehouse_id,
                            after,
                            now,
                        )),
                    });
                }
                Err(e) if e.is_client_error() => {
                    sp.rollback()
                        .await
                        .map_err(|e| map_sqlx_error("stock.bulk_write", e))?;
                    results.push(BulkStockResult {
                        product_id: item.product_id,
                        warehouse_id: item.warehouse_id,
                        result: Err(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("stock.bulk_write", e))?;

        for (row_id, before, after) in audits {
            self.audit_write(identity, row_id, &before, &after).await;
        }
        Ok(results)
    }

    async fn audit_write(
        &self,
        identity: &Identity,
        row_id: Uuid,
        before: &Option<StockLevel>,
        after: &StockLevel,
    ) {
        let (action, changes) = match before {
            Some(before) => (AuditAction::Update, ChangeSet::updated(before, after)),
            None => (AuditAction::Create, ChangeSet::created(after)),
        };
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                action,
                AuditEntityType::StockItem,
                row_id,
                changes,
            ))
            .await;
    }

    async fn ensure_refs(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<()> {
        let (product_exists, warehouse_exists) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE id = $1), \
                    EXISTS (SELECT 1 FROM warehouses WHERE id = $2)",
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock.ensure_refs", e))?;

        check_refs(product_exists, warehouse_exists)
    }

    async fn ensure_refs_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> DomainResult<()> {
        let (product_exists, warehouse_exists) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE id = $1), \
                    EXISTS (SELECT 1 FROM warehouses WHERE id = $2)",
        )
        .bind(product_id.as_uuid())
        .bind(warehouse_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("stock.ensure_refs", e))?;

        check_refs(product_exists, warehouse_exists)
    }
}

fn check_refs(product_exists: bool, warehouse_exists: bool) -> DomainResult<()> {
    if !product_exists {
        return Err(DomainError::not_found("product"));
    }
    if !warehouse_exists {
        return Err(DomainError::not_found("warehouse"));
    }
    Ok(())
}

/// Lock the cell, apply the write in the domain, upsert the result.
///
/// Returns the row id plus the level before (None for a fresh cell) and
/// after. Also used by purchase order receiving.
pub(crate) async fn apply_write(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    write: StockWrite,
    now: DateTime<Utc>,
) -> DomainResult<(Uuid, Option<StockLevel>, StockLevel)> {
    let before = lock_level(tx, product_id, warehouse_id).await?;
    let current = before.unwrap_or_else(StockLevel::zero);
    let after = write.apply(&current, now)?;
    let row_id = upsert_level(tx, product_id, warehouse_id, &after, now).await?;
    Ok((row_id, before, after))
}

async fn lock_level(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    warehouse_id: WarehouseId,
) -> DomainResult<Option<StockLevel>> {
    let row = sqlx::query_as::<_, (i64, i64, Option<DateTime<Utc>>)>(
        "SELECT quantity, reserved_qty, last_count_at FROM stock_items \
         WHERE product_id = $1 AND warehouse_id = $2 FOR UPDATE",
    )
    .bind(product_id.as_uuid())
    .bind(warehouse_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("stock.lock", e))?;

    Ok(row.map(|(quantity, reserved_qty, last_count_at)| StockLevel {
        quantity,
        reserved_qty,
        last_count_at,
    }))
}

async fn upsert_level(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    level: &StockLevel,
    now: DateTime<Utc>,
) -> DomainResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO stock_items (id, product_id, warehouse_id, quantity, reserved_qty,
                                 last_count_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (product_id, warehouse_id) DO UPDATE
            SET quantity = EXCLUDED.quantity,
                reserved_qty = EXCLUDED.reserved_qty,
                last_count_at = EXCLUDED.last_count_at,
                updated_at = EXCLUDED.updated_at
        RETURNING id
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(product_id.as_uuid())
    .bind(warehouse_id.as_uuid())
    .bind(level.quantity)
    .bind(level.reserved_qty)
    .bind(level.last_count_at)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("stock.upsert", e))?;
    Ok(id)
}
