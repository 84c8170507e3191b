//! Audit trail persistence. Append and read only; no update or delete
//! statements exist for this table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, AuditEntry, ChangeSet, NewAuditEntry};
use stockdesk_core::{AuditLogId, DomainError, DomainResult, Page, PageQuery, UserId};

use crate::error::map_sqlx_error;

/// Highest page size the audit listing will serve.
pub const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFilter {
    pub entity_type: Option<AuditEntityType>,
    pub entity_id: Option<Uuid>,
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
}

#[derive(Clone)]
pub struct AuditStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    changes: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let changes: ChangeSet = serde_json::from_value(row.changes)
            .map_err(|e| DomainError::storage(format!("corrupt audit changes: {e}")))?;
        Ok(AuditEntry {
            id: AuditLogId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            action: row.action.parse()?,
            entity_type: row.entity_type.parse()?,
            entity_id: row.entity_id,
            changes,
            created_at: row.created_at,
        })
    }
}

impl AuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry.
    pub async fn record(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry> {
        let id = AuditLogId::new();
        let changes = serde_json::to_value(&entry.changes)
            .map_err(|e| DomainError::storage(format!("serialize audit changes: {e}")))?;

        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, changes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, action, entity_type, entity_id, changes, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(changes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("audit_logs.record", e))?;

        row.try_into()
    }

    /// Append, but never fail the caller: mutations audit after the fact and
    /// an audit failure must not unwind a committed write.
    pub async fn record_best_effort(&self, entry: NewAuditEntry) {
        let entity_type = entry.entity_type;
        let entity_id = entry.entity_id;
        if let Err(error) = self.record(entry).await {
            tracing::warn!(
                %entity_type,
                %entity_id,
                %error,
                "audit entry dropped"
            );
        }
    }

    pub async fn get(&self, id: AuditLogId) -> DomainResult<AuditEntry> {
        let row = sqlx::query_as::<_, AuditRow>(
            "SELECT id, user_id, action, entity_type, entity_id, changes, created_at \
             FROM audit_logs WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("audit_logs.get", e))?;

        row.ok_or_else(|| DomainError::not_found("audit log entry"))?
            .try_into()
    }

    /// Newest first, filterable by entity, user and action.
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: PageQuery,
    ) -> DomainResult<Page<AuditEntry>> {
        let (limit, offset) = page.resolve(MAX_AUDIT_LIMIT);
        let entity_type = filter.entity_type.map(|t| t.as_str());
        let action = filter.action.map(|a| a.as_str());
        let user_id = filter.user_id.map(|u| *u.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
              AND ($4::text IS NULL OR action = $4)
            "#,
        )
        .bind(entity_type)
        .bind(filter.entity_id)
        .bind(user_id)
        .bind(action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("audit_logs.count", e))?;

        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, changes, created_at
            FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
              AND ($4::text IS NULL OR action = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(entity_type)
        .bind(filter.entity_id)
        .bind(user_id)
        .bind(action)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("audit_logs.list", e))?;

        let data = rows
            .into_iter()
            .map(AuditEntry::try_from)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Page::new(data, total, limit, offset))
    }
}
