//! Product persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::product::{self, NewProduct, Product, ProductDependents, ProductPatch};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{
    CategoryId, DomainError, DomainResult, Identity, OrganizationId, Page, PageQuery, ProductId,
};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub organization_id: Option<OrganizationId>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring match on sku or name.
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct ProductStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    unit_price: Decimal,
    cost_price: Decimal,
    min_stock_level: i64,
    reorder_point: i64,
    is_taxable: bool,
    is_active: bool,
    organization_id: Uuid,
    category_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            sku: row.sku,
            name: row.name,
            description: row.description,
            unit_price: row.unit_price,
            cost_price: row.cost_price,
            min_stock_level: row.min_stock_level,
            reorder_point: row.reorder_point,
            is_taxable: row.is_taxable,
            is_active: row.is_active,
            organization_id: OrganizationId::from_uuid(row.organization_id),
            category_id: row.category_id.map(CategoryId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, sku, name, description, unit_price, cost_price, min_stock_level, \
                       reorder_point, is_taxable, is_active, organization_id, category_id, \
                       created_at, updated_at";

const FILTER: &str = "($1::uuid IS NULL OR organization_id = $1) \
                      AND ($2::uuid IS NULL OR category_id = $2) \
                      AND ($3::boolean IS NULL OR is_active = $3) \
                      AND ($4::text IS NULL OR sku ILIKE '%' || $4 || '%' \
                           OR name ILIKE '%' || $4 || '%')";

impl ProductStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageQuery,
    ) -> DomainResult<Page<Product>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);
        let organization = filter.organization_id.map(|o| *o.as_uuid());
        let category = filter.category_id.map(|c| *c.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products WHERE {FILTER}"
        ))
        .bind(organization)
        .bind(category)
        .bind(filter.is_active)
        .bind(filter.search.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.count", e))?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE {FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(organization)
        .bind(category)
        .bind(filter.is_active)
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.list", e))?;

        let data = rows.into_iter().map(Product::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: ProductId) -> DomainResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.get", e))?;

        row.map(Product::from)
            .ok_or_else(|| DomainError::not_found("product"))
    }

    pub async fn create(&self, new: NewProduct, identity: &Identity) -> DomainResult<Product> {
        new.validate()?;
        self.ensure_organization(new.organization_id).await?;
        if let Some(category_id) = new.category_id {
            self.ensure_category(category_id).await?;
        }
        let product = new.into_product(ProductId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO products (id, sku, name, description, unit_price, cost_price, \
             min_stock_level, reorder_point, is_taxable, is_active, organization_id, \
             category_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.unit_price)
        .bind(product.cost_price)
        .bind(product.min_stock_level)
        .bind(product.reorder_point)
        .bind(product.is_taxable)
        .bind(product.is_active)
        .bind(product.organization_id.as_uuid())
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Product,
                *product.id.as_uuid(),
                ChangeSet::created(&product),
            ))
            .await;
        Ok(product)
    }

    pub async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        identity: &Identity,
    ) -> DomainResult<Product> {
        patch.validate()?;
        let before = self.get(id).await?;
        if let Some(Some(category_id)) = patch.category_id {
            self.ensure_category(category_id).await?;
        }

        let mut product = before.clone();
        patch.apply(&mut product, Utc::now());

        sqlx::query(
            "UPDATE products SET sku = $2, name = $3, description = $4, unit_price = $5, \
             cost_price = $6, min_stock_level = $7, reorder_point = $8, is_taxable = $9, \
             is_active = $10, category_id = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.unit_price)
        .bind(product.cost_price)
        .bind(product.min_stock_level)
        .bind(product.reorder_point)
        .bind(product.is_taxable)
        .bind(product.is_active)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Product,
                *product.id.as_uuid(),
                ChangeSet::updated(&before, &product),
            ))
            .await;
        Ok(product)
    }

    /// Positive stock blocks the delete outright; order references turn it
    /// into a soft delete. A hard delete also removes the product's
    /// zero-quantity stock rows so the foreign keys allow it.
    pub async fn delete(&self, id: ProductId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;
        let deps = self.dependents(id).await?;
        let outcome = product::delete_outcome(deps)?;

        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query("UPDATE products SET is_active = FALSE, updated_at = $2 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(after.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("products.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| map_sqlx_error("products.delete", e))?;
                sqlx::query("DELETE FROM stock_items WHERE product_id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("products.delete", e))?;
                sqlx::query("DELETE FROM products WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("products.delete", e))?;
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("products.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Product,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }

    async fn dependents(&self, id: ProductId) -> DomainResult<ProductDependents> {
        let stock_on_hand = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM stock_items WHERE product_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.dependents", e))?;
        let order_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM order_items WHERE product_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.dependents", e))?;
        let purchase_order_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_order_items WHERE product_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.dependents", e))?;

        Ok(ProductDependents {
            stock_on_hand,
            order_items,
            purchase_order_items,
        })
    }

    async fn ensure_organization(&self, id: OrganizationId) -> DomainResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products.ensure_organization", e))?;
        if exists {
            Ok(())
        } else {
            Err(DomainError::not_found("organization"))
        }
    }

    async fn ensure_category(&self, id: CategoryId) -> DomainResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("products.ensure_category", e))?;
        if exists {
            Ok(())
        } else {
            Err(DomainError::not_found("category"))
        }
    }
}
