//! Purchase order persistence and the receive workflow.
//!
//! Receiving is planned in the domain (`plan_receipt`) and applied here as
//! one transaction: line `received_qty` bumps, stock upserts into the
//! receiving warehouse, and the header status write all commit or roll back
//! together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_core::order_number::{self, PURCHASE_ORDER_PREFIX};
use stockdesk_core::{
    DomainError, DomainResult, Identity, Page, PageQuery, ProductId, PurchaseOrderId,
    PurchaseOrderItemId, SupplierId, WarehouseId,
};
use stockdesk_purchasing::order::{self, NewPurchaseOrderItem};
use stockdesk_purchasing::{
    plan_receipt, NewPurchaseOrder, PurchaseOrder, PurchaseOrderItem, PurchaseOrderPatch,
    PurchaseOrderStatus, ReceiptRequest,
};
use stockdesk_stock::{QuantityWrite, StockWrite};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<SupplierId>,
}

/// Header plus lines, the unit the API works with.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderWithItems {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Clone)]
pub struct PurchaseOrderStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    order_number: String,
    supplier_id: Uuid,
    status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_amount: Decimal,
    total_amount: Decimal,
    notes: Option<String>,
    ordered_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = DomainError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PurchaseOrderId::from_uuid(row.id),
            order_number: row.order_number,
            supplier_id: SupplierId::from_uuid(row.supplier_id),
            status: row.status.parse()?,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            shipping_amount: row.shipping_amount,
            total_amount: row.total_amount,
            notes: row.notes,
            ordered_at: row.ordered_at,
            received_at: row.received_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseOrderItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price: Decimal,
    received_qty: i64,
}

impl From<PurchaseOrderItemRow> for PurchaseOrderItem {
    fn from(row: PurchaseOrderItemRow) -> Self {
        Self {
            id: PurchaseOrderItemId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
            received_qty: row.received_qty,
        }
    }
}

const COLUMNS: &str = "id, order_number, supplier_id, status, subtotal, tax_amount, \
                       shipping_amount, total_amount, notes, ordered_at, received_at, \
                       created_at, updated_at";

impl PurchaseOrderStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        page: PageQuery,
    ) -> DomainResult<Page<PurchaseOrder>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);
        let status = filter.status.map(|s| s.as_str());
        let supplier = filter.supplier_id.map(|s| *s.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM purchase_orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR supplier_id = $2)
            "#,
        )
        .bind(status)
        .bind(supplier)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.count", e))?;

        let rows = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {COLUMNS} FROM purchase_orders \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR supplier_id = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(supplier)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.list", e))?;

        let data = rows
            .into_iter()
            .map(PurchaseOrder::try_from)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: PurchaseOrderId) -> DomainResult<PurchaseOrderWithItems> {
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {COLUMNS} FROM purchase_orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.get", e))?;

        let order: PurchaseOrder = row
            .ok_or_else(|| DomainError::not_found("purchase order"))?
            .try_into()?;
        let items = self.items(id).await?;
        Ok(PurchaseOrderWithItems { order, items })
    }

    pub async fn create(
        &self,
        new: NewPurchaseOrder,
        identity: &Identity,
    ) -> DomainResult<PurchaseOrderWithItems> {
        new.validate()?;
        self.ensure_supplier(new.supplier_id).await?;
        self.ensure_products(new.items.iter().map(|i| i.product_id))
            .await?;

        let now = Utc::now();
        let subtotal = order::subtotal(&new.items);
        let total_amount = order::total_amount(subtotal, new.tax_amount, new.shipping_amount);
        let order = PurchaseOrder {
            id: PurchaseOrderId::new(),
            order_number: new
                .order_number
                .unwrap_or_else(|| order_number::generate(PURCHASE_ORDER_PREFIX, now)),
            supplier_id: new.supplier_id,
            status: PurchaseOrderStatus::Draft,
            subtotal,
            tax_amount: new.tax_amount,
            shipping_amount: new.shipping_amount,
            total_amount,
            notes: new.notes,
            ordered_at: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.create", e))?;
        sqlx::query(
            "INSERT INTO purchase_orders (id, order_number, supplier_id, status, subtotal, \
             tax_amount, shipping_amount, total_amount, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.supplier_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.shipping_amount)
        .bind(order.total_amount)
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.create", e))?;

        let items = insert_items(&mut tx, order.id, &new.items, now).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.create", e))?;

        let with_items = PurchaseOrderWithItems { order, items };
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::PurchaseOrder,
                *with_items.order.id.as_uuid(),
                ChangeSet::created(&with_items),
            ))
            .await;
        Ok(with_items)
    }

    pub async fn update(
        &self,
        id: PurchaseOrderId,
        patch: PurchaseOrderPatch,
        identity: &Identity,
    ) -> DomainResult<PurchaseOrderWithItems> {
        patch.validate()?;
        let before = self.get(id).await?;
        let current = before.order.status;

        if let Some(next) = patch.status {
            if next != current {
                // partial/received are written exclusively by the receive
                // operation.
                if next.is_receipt_driven() || !current.can_transition_to(next) {
                    return Err(DomainError::invalid_transition(
                        current.as_str(),
                        next.as_str(),
                    ));
                }
            }
        }
        if patch.touches_editable_fields() && !current.is_editable() {
            return Err(DomainError::invalid_state(
                current.as_str(),
                "edit purchase order",
            ));
        }
        if let Some(items) = &patch.items {
            self.ensure_products(items.iter().map(|i| i.product_id))
                .await?;
        }

        let now = Utc::now();
        let mut order = before.order.clone();
        if let Some(next) = patch.status {
            if next == PurchaseOrderStatus::Ordered && order.ordered_at.is_none() {
                order.ordered_at = Some(now);
            }
            order.status = next;
        }
        if let Some(tax_amount) = patch.tax_amount {
            order.tax_amount = tax_amount;
        }
        if let Some(shipping_amount) = patch.shipping_amount {
            order.shipping_amount = shipping_amount;
        }
        if let Some(notes) = &patch.notes {
            order.notes = notes.clone();
        }
        if let Some(items) = &patch.items {
            order.subtotal = order::subtotal(items);
        }
        order.total_amount =
            order::total_amount(order.subtotal, order.tax_amount, order.shipping_amount);
        order.updated_at = now;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.update", e))?;
        sqlx::query(
            "UPDATE purchase_orders SET status = $2, subtotal = $3, tax_amount = $4, \
             shipping_amount = $5, total_amount = $6, notes = $7, ordered_at = $8, \
             updated_at = $9 WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.shipping_amount)
        .bind(order.total_amount)
        .bind(order.notes.as_deref())
        .bind(order.ordered_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.update", e))?;

        let items = match &patch.items {
            Some(new_items) => {
                sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = $1")
                    .bind(order.id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("purchase_orders.update", e))?;
                insert_items(&mut tx, order.id, new_items, now).await?
            }
            None => before.items.clone(),
        };
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.update", e))?;

        let with_items = PurchaseOrderWithItems { order, items };
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::PurchaseOrder,
                *id.as_uuid(),
                ChangeSet::updated(&before, &with_items),
            ))
            .await;
        Ok(with_items)
    }

    /// Receive goods into `warehouse_id`.
    ///
    /// `requested = None` receives every line in full. Stock bumps, line
    /// updates and the status write share one transaction.
    pub async fn receive(
        &self,
        id: PurchaseOrderId,
        warehouse_id: WarehouseId,
        requested: Option<Vec<ReceiptRequest>>,
        identity: &Identity,
    ) -> DomainResult<PurchaseOrderWithItems> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(warehouse_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.receive", e))?;
        if !exists {
            return Err(DomainError::not_found("warehouse"));
        }

        let before = self.get(id).await?;
        let plan = plan_receipt(before.order.status, &before.items, requested.as_deref())?;

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.receive", e))?;

        let mut stock_audits = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            sqlx::query(
                "UPDATE purchase_order_items SET received_qty = received_qty + $2, \
                 updated_at = $3 WHERE id = $1",
            )
            .bind(line.item_id.as_uuid())
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.receive", e))?;

            let write = StockWrite {
                quantity: QuantityWrite::Adjust(line.quantity),
                reserved_qty: None,
                is_count: false,
            };
            let (row_id, stock_before, stock_after) =
                crate::stock::apply_write(&mut tx, line.product_id, warehouse_id, write, now)
                    .await?;
            stock_audits.push((row_id, stock_before, stock_after));
        }

        let received_at = if plan.fully_received {
            Some(now)
        } else {
            before.order.received_at
        };
        sqlx::query(
            "UPDATE purchase_orders SET status = $2, received_at = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(plan.status_after.as_str())
        .bind(received_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.receive", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.receive", e))?;

        let after = self.get(id).await?;
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::PurchaseOrder,
                *id.as_uuid(),
                ChangeSet::updated(&before, &after),
            ))
            .await;
        for (row_id, stock_before, stock_after) in stock_audits {
            let (action, changes) = match stock_before {
                Some(b) => (AuditAction::Update, ChangeSet::updated(&b, &stock_after)),
                None => (AuditAction::Create, ChangeSet::created(&stock_after)),
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
        Ok(after)
    }

    /// Only draft orders may be deleted; everything else must be cancelled.
    pub async fn delete(&self, id: PurchaseOrderId, identity: &Identity) -> DomainResult<()> {
        let before = self.get(id).await?;
        if before.order.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(
                before.order.status.as_str(),
                "delete purchase order",
            ));
        }

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("purchase_orders.delete", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::PurchaseOrder,
                *id.as_uuid(),
                ChangeSet::deleted(&before),
            ))
            .await;
        Ok(())
    }

    async fn items(&self, id: PurchaseOrderId) -> DomainResult<Vec<PurchaseOrderItem>> {
        let rows = sqlx::query_as::<_, PurchaseOrderItemRow>(
            "SELECT id, product_id, quantity, unit_price, received_qty \
             FROM purchase_order_items WHERE purchase_order_id = $1 ORDER BY created_at, id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.items", e))?;

        Ok(rows.into_iter().map(PurchaseOrderItem::from).collect())
    }

    async fn ensure_supplier(&self, id: SupplierId) -> DomainResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("purchase_orders.ensure_supplier", e))?;
        if exists {
            Ok(())
        } else {
            Err(DomainError::not_found("supplier"))
        }
    }

    async fn ensure_products(
        &self,
        product_ids: impl Iterator<Item = ProductId>,
    ) -> DomainResult<()> {
        let mut ids: Vec<Uuid> = product_ids.map(|p| *p.as_uuid()).collect();
        ids.sort_unstable();
        ids.dedup();

        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.ensure_products", e))?;

        if found as usize == ids.len() {
            Ok(())
        } else {
            Err(DomainError::not_found("product"))
        }
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: PurchaseOrderId,
    items: &[NewPurchaseOrderItem],
    now: DateTime<Utc>,
) -> DomainResult<Vec<PurchaseOrderItem>> {
    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let line = PurchaseOrderItem {
            id: PurchaseOrderItemId::new(),
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            received_qty: 0,
        };
        sqlx::query(
            "INSERT INTO purchase_order_items (id, purchase_order_id, product_id, quantity, \
             unit_price, total_price, received_qty, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $7)",
        )
        .bind(line.id.as_uuid())
        .bind(order_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total_price())
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("purchase_orders.insert_items", e))?;
        inserted.push(line);
    }
    Ok(inserted)
}
