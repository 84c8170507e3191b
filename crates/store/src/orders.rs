//! Sales order persistence.
//!
//! Prices and tax are resolved at creation time from the product catalog
//! and the customer's exemption flag, then frozen; updates can only move
//! the status and edit notes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_core::order_number::{self, SALES_ORDER_PREFIX};
use stockdesk_core::{
    CustomerId, DomainError, DomainResult, Identity, OrderId, OrderItemId, Page, PageQuery,
    ProductId,
};
use stockdesk_sales::{order_totals, price_line, NewOrder, Order, OrderItem, OrderPatch, OrderStatus};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<CustomerId>,
}

/// Header plus lines, the unit the API works with.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Uuid,
    status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    discount_amount: Decimal,
    shipping_amount: Decimal,
    total_amount: Decimal,
    notes: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            order_number: row.order_number,
            customer_id: CustomerId::from_uuid(row.customer_id),
            status: row.status.parse()?,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            discount_amount: row.discount_amount,
            shipping_amount: row.shipping_amount,
            total_amount: row.total_amount,
            notes: row.notes,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price: Decimal,
    discount: Decimal,
    tax_amount: Decimal,
    total_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
            discount: row.discount,
            tax_amount: row.tax_amount,
            total_price: row.total_price,
        }
    }
}

const COLUMNS: &str = "id, order_number, customer_id, status, subtotal, tax_amount, \
                       discount_amount, shipping_amount, total_amount, notes, shipped_at, \
                       delivered_at, created_at, updated_at";

impl OrderStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(&self, filter: &OrderFilter, page: PageQuery) -> DomainResult<Page<Order>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);
        let status = filter.status.map(|s| s.as_str());
        let customer = filter.customer_id.map(|c| *c.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
            "#,
        )
        .bind(status)
        .bind(customer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.count", e))?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR customer_id = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(customer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.list", e))?;

        let data = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: OrderId) -> DomainResult<OrderWithItems> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.get", e))?;

        let order: Order = row.ok_or_else(|| DomainError::not_found("order"))?.try_into()?;
        let items = self.items(id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn create(&self, new: NewOrder, identity: &Identity) -> DomainResult<OrderWithItems> {
        new.validate()?;

        let tax_exempt = sqlx::query_scalar::<_, bool>(
            "SELECT tax_exempt FROM customers WHERE id = $1",
        )
        .bind(new.customer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.create", e))?
        .ok_or_else(|| DomainError::not_found("customer"))?;

        let products = self
            .product_pricing(new.items.iter().map(|i| i.product_id))
            .await?;

        let now = Utc::now();
        let mut items = Vec::with_capacity(new.items.len());
        let mut priced = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let (catalog_price, is_taxable) = products
                .get(&item.product_id)
                .copied()
                .ok_or_else(|| DomainError::not_found("product"))?;
            let unit_price = item.unit_price.unwrap_or(catalog_price);
            let line = price_line(
                item.quantity,
                unit_price,
                item.discount,
                is_taxable && !tax_exempt,
            )?;
            items.push(OrderItem {
                id: OrderItemId::new(),
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price,
                discount: item.discount,
                tax_amount: line.tax_amount,
                total_price: line.total_price,
            });
            priced.push(line);
        }
        let totals = order_totals(&priced, new.discount_amount, new.shipping_amount);

        let order = Order {
            id: OrderId::new(),
            order_number: new
                .order_number
                .unwrap_or_else(|| order_number::generate(SALES_ORDER_PREFIX, now)),
            customer_id: new.customer_id,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            discount_amount: new.discount_amount,
            shipping_amount: new.shipping_amount,
            total_amount: totals.total_amount,
            notes: new.notes,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("orders.create", e))?;
        sqlx::query(
            "INSERT INTO orders (id, order_number, customer_id, status, subtotal, \
             discount_amount, tax_amount, shipping_amount, total_amount, notes, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.discount_amount)
        .bind(order.tax_amount)
        .bind(order.shipping_amount)
        .bind(order.total_amount)
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("orders.create", e))?;

        for item in &items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, \
                 discount, tax_amount, total_price, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.discount)
            .bind(item.tax_amount)
            .bind(item.total_price)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("orders.create", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("orders.create", e))?;

        let with_items = OrderWithItems { order, items };
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Order,
                *with_items.order.id.as_uuid(),
                ChangeSet::created(&with_items),
            ))
            .await;
        Ok(with_items)
    }

    pub async fn update(
        &self,
        id: OrderId,
        patch: OrderPatch,
        identity: &Identity,
    ) -> DomainResult<OrderWithItems> {
        let before = self.get(id).await?;
        let current = before.order.status;

        let now = Utc::now();
        let mut order = before.order.clone();
        if let Some(next) = patch.status {
            if next != current {
                if !current.can_transition_to(next) {
                    return Err(DomainError::invalid_transition(
                        current.as_str(),
                        next.as_str(),
                    ));
                }
                if next == OrderStatus::Shipped && order.shipped_at.is_none() {
                    order.shipped_at = Some(now);
                }
                if next == OrderStatus::Delivered && order.delivered_at.is_none() {
                    order.delivered_at = Some(now);
                }
                order.status = next;
            }
        }
        if let Some(notes) = &patch.notes {
            order.notes = notes.clone();
        }
        order.updated_at = now;

        sqlx::query(
            "UPDATE orders SET status = $2, notes = $3, shipped_at = $4, delivered_at = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.notes.as_deref())
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.update", e))?;

        let with_items = OrderWithItems {
            order,
            items: before.items.clone(),
        };
        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Order,
                *id.as_uuid(),
                ChangeSet::updated(&before, &with_items),
            ))
            .await;
        Ok(with_items)
    }

    /// Only pending orders may be deleted; anything further along must be
    /// cancelled or refunded through the status workflow.
    pub async fn delete(&self, id: OrderId, identity: &Identity) -> DomainResult<()> {
        let before = self.get(id).await?;
        if before.order.status != OrderStatus::Pending {
            return Err(DomainError::invalid_state(
                before.order.status.as_str(),
                "delete order",
            ));
        }

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("orders.delete", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Order,
                *id.as_uuid(),
                ChangeSet::deleted(&before),
            ))
            .await;
        Ok(())
    }

    async fn items(&self, id: OrderId) -> DomainResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, product_id, quantity, unit_price, discount, tax_amount, total_price \
             FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.items", e))?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// product id → (current unit price, taxable flag).
    async fn product_pricing(
        &self,
        product_ids: impl Iterator<Item = ProductId>,
    ) -> DomainResult<HashMap<ProductId, (Decimal, bool)>> {
        let mut ids: Vec<Uuid> = product_ids.map(|p| *p.as_uuid()).collect();
        ids.sort_unstable();
        ids.dedup();

        let rows = sqlx::query_as::<_, (Uuid, Decimal, bool)>(
            "SELECT id, unit_price, is_taxable FROM products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders.product_pricing", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, price, taxable)| (ProductId::from_uuid(id), (price, taxable)))
            .collect())
    }
}
