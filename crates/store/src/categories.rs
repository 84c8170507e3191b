//! Category persistence.
//!
//! The sibling-slug uniqueness lives in the schema (`NULLS NOT DISTINCT`
//! unique on `(parent_id, slug)`); the store only pre-checks the parts the
//! database cannot express, namely parent existence and reparenting cycles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::category::{self, Category, CategoryPatch, NewCategory};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{CategoryId, DomainError, DomainResult, Identity, Page, PageQuery};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Clone)]
pub struct CategoryStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    slug: String,
    name: String,
    parent_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::from_uuid(row.id),
            slug: row.slug,
            name: row.name,
            parent_id: row.parent_id.map(CategoryId::from_uuid),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, slug, name, parent_id, is_active, created_at, updated_at";

impl CategoryStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        parent_id: Option<CategoryId>,
        page: PageQuery,
    ) -> DomainResult<Page<Category>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);
        let parent = parent_id.map(|p| *p.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE ($1::uuid IS NULL OR parent_id = $1)",
        )
        .bind(parent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.count", e))?;

        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {COLUMNS} FROM categories \
             WHERE ($1::uuid IS NULL OR parent_id = $1) \
             ORDER BY slug, id LIMIT $2 OFFSET $3"
        ))
        .bind(parent)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.list", e))?;

        let data = rows.into_iter().map(Category::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: CategoryId) -> DomainResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.get", e))?;

        row.map(Category::from)
            .ok_or_else(|| DomainError::not_found("category"))
    }

    pub async fn create(&self, new: NewCategory, identity: &Identity) -> DomainResult<Category> {
        new.validate()?;
        if let Some(parent_id) = new.parent_id {
            self.get(parent_id).await?;
        }
        let category = new.into_category(CategoryId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO categories (id, slug, name, parent_id, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.slug)
        .bind(&category.name)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Category,
                *category.id.as_uuid(),
                ChangeSet::created(&category),
            ))
            .await;
        Ok(category)
    }

    pub async fn update(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
        identity: &Identity,
    ) -> DomainResult<Category> {
        patch.validate()?;
        let before = self.get(id).await?;

        if let Some(Some(new_parent)) = patch.parent_id {
            self.get(new_parent).await?;
            let parents = self.parent_map().await?;
            category::ensure_no_cycle(id, new_parent, &parents)?;
        }

        let mut category = before.clone();
        patch.apply(&mut category, Utc::now());

        sqlx::query(
            "UPDATE categories SET slug = $2, name = $3, parent_id = $4, is_active = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(category.id.as_uuid())
        .bind(&category.slug)
        .bind(&category.name)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.is_active)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Category,
                *category.id.as_uuid(),
                ChangeSet::updated(&before, &category),
            ))
            .await;
        Ok(category)
    }

    pub async fn delete(&self, id: CategoryId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;

        let product_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE category_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("categories.delete", e))?;
        let child_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE parent_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("categories.delete", e))?;

        let outcome = category::delete_outcome(product_count, child_count);
        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query(
                    "UPDATE categories SET is_active = FALSE, updated_at = $2 WHERE id = $1",
                )
                .bind(id.as_uuid())
                .bind(after.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("categories.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                sqlx::query("DELETE FROM categories WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("categories.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Category,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }

    /// id → parent id for every category, for the reparenting cycle check.
    async fn parent_map(&self) -> DomainResult<HashMap<CategoryId, Option<CategoryId>>> {
        let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
            "SELECT id, parent_id FROM categories",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories.parent_map", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, parent)| (CategoryId::from_uuid(id), parent.map(CategoryId::from_uuid)))
            .collect())
    }
}
