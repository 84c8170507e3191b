//! Customer persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType, ChangeSet, NewAuditEntry};
use stockdesk_catalog::customer::{self, Customer, CustomerPatch, NewCustomer};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{CustomerId, DomainError, DomainResult, Identity, Page, PageQuery};

use crate::audit::AuditStore;
use crate::error::map_sqlx_error;
use crate::MAX_PAGE_LIMIT;

#[derive(Clone)]
pub struct CustomerStore {
    pool: PgPool,
    audit: AuditStore,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    code: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    tax_exempt: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            email: row.email,
            phone: row.phone,
            tax_exempt: row.tax_exempt,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, code, name, email, phone, tax_exempt, is_active, created_at, updated_at";

impl CustomerStore {
    pub fn new(pool: PgPool, audit: AuditStore) -> Self {
        Self { pool, audit }
    }

    pub async fn list(
        &self,
        is_active: Option<bool>,
        page: PageQuery,
    ) -> DomainResult<Page<Customer>> {
        let (limit, offset) = page.resolve(MAX_PAGE_LIMIT);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM customers WHERE ($1::boolean IS NULL OR is_active = $1)",
        )
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers.count", e))?;

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE ($1::boolean IS NULL OR is_active = $1) \
             ORDER BY code, id LIMIT $2 OFFSET $3"
        ))
        .bind(is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers.list", e))?;

        let data = rows.into_iter().map(Customer::from).collect();
        Ok(Page::new(data, total, limit, offset))
    }

    pub async fn get(&self, id: CustomerId) -> DomainResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers.get", e))?;

        row.map(Customer::from)
            .ok_or_else(|| DomainError::not_found("customer"))
    }

    pub async fn create(&self, new: NewCustomer, identity: &Identity) -> DomainResult<Customer> {
        new.validate()?;
        let customer = new.into_customer(CustomerId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO customers (id, code, name, email, phone, tax_exempt, is_active, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(customer.email.as_deref())
        .bind(customer.phone.as_deref())
        .bind(customer.tax_exempt)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers.create", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Create,
                AuditEntityType::Customer,
                *customer.id.as_uuid(),
                ChangeSet::created(&customer),
            ))
            .await;
        Ok(customer)
    }

    pub async fn update(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
        identity: &Identity,
    ) -> DomainResult<Customer> {
        patch.validate()?;
        let before = self.get(id).await?;
        let mut customer = before.clone();
        patch.apply(&mut customer, Utc::now());

        sqlx::query(
            "UPDATE customers SET code = $2, name = $3, email = $4, phone = $5, tax_exempt = $6, \
             is_active = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(customer.email.as_deref())
        .bind(customer.phone.as_deref())
        .bind(customer.tax_exempt)
        .bind(customer.is_active)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers.update", e))?;

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Update,
                AuditEntityType::Customer,
                *customer.id.as_uuid(),
                ChangeSet::updated(&before, &customer),
            ))
            .await;
        Ok(customer)
    }

    pub async fn delete(&self, id: CustomerId, identity: &Identity) -> DomainResult<DeleteOutcome> {
        let before = self.get(id).await?;

        let order_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("customers.delete", e))?;

        let outcome = customer::delete_outcome(order_count);
        let changes = match outcome {
            DeleteOutcome::Soft => {
                let mut after = before.clone();
                after.is_active = false;
                after.updated_at = Utc::now();
                sqlx::query("UPDATE customers SET is_active = FALSE, updated_at = $2 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(after.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("customers.delete", e))?;
                ChangeSet::updated(&before, &after)
            }
            DeleteOutcome::Hard => {
                sqlx::query("DELETE FROM customers WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("customers.delete", e))?;
                ChangeSet::deleted(&before)
            }
        };

        self.audit
            .record_best_effort(NewAuditEntry::new(
                identity.user_id(),
                AuditAction::Delete,
                AuditEntityType::Customer,
                *id.as_uuid(),
                changes,
            ))
            .await;
        Ok(outcome)
    }
}
