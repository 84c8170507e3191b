use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockdesk_core::{DomainError, DomainResult, SupplierId};

use crate::customer::validate_code_and_name;
use crate::DeleteOutcome;

/// A supplier purchase orders are placed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSupplier {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewSupplier {
    pub fn validate(&self) -> DomainResult<()> {
        validate_code_and_name(&self.code, &self.name)
    }

    pub fn into_supplier(self, id: SupplierId, now: DateTime<Utc>) -> Supplier {
        Supplier {
            id,
            code: self.code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl SupplierPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(code) = &self.code {
            if code.trim().is_empty() {
                return Err(DomainError::validation("code must not be empty"));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        Ok(())
    }

    pub fn apply(&self, supplier: &mut Supplier, now: DateTime<Utc>) {
        if let Some(code) = &self.code {
            supplier.code = code.clone();
        }
        if let Some(name) = &self.name {
            supplier.name = name.clone();
        }
        if let Some(email) = &self.email {
            supplier.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            supplier.phone = phone.clone();
        }
        if let Some(is_active) = self.is_active {
            supplier.is_active = is_active;
        }
        supplier.updated_at = now;
    }
}

/// Existing purchase orders downgrade a supplier delete to a soft delete.
pub fn delete_outcome(purchase_order_count: i64) -> DeleteOutcome {
    if purchase_order_count > 0 {
        DeleteOutcome::Soft
    } else {
        DeleteOutcome::Hard
    }
}
