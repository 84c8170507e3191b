use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockdesk_core::{DomainError, DomainResult, OrganizationId, WarehouseId};

use crate::customer::validate_code_and_name;
use crate::DeleteOutcome;

/// A physical stock location.
///
/// At most one warehouse per organization is the default; the store flips
/// the previous default inside the same transaction that sets a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub code: String,
    pub name: String,
    pub organization_id: OrganizationId,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWarehouse {
    pub code: String,
    pub name: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub is_default: bool,
}

impl NewWarehouse {
    pub fn validate(&self) -> DomainResult<()> {
        validate_code_and_name(&self.code, &self.name)
    }

    pub fn into_warehouse(self, id: WarehouseId, now: DateTime<Utc>) -> Warehouse {
        Warehouse {
            id,
            code: self.code,
            name: self.name,
            organization_id: self.organization_id,
            is_default: self.is_default,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehousePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

impl WarehousePatch {
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

    pub fn apply(&self, warehouse: &mut Warehouse, now: DateTime<Utc>) {
        if let Some(code) = &self.code {
            warehouse.code = code.clone();
        }
        if let Some(name) = &self.name {
            warehouse.name = name.clone();
        }
        if let Some(is_default) = self.is_default {
            warehouse.is_default = is_default;
        }
        if let Some(is_active) = self.is_active {
            warehouse.is_active = is_active;
        }
        warehouse.updated_at = now;
    }
}

/// Existing stock rows downgrade a warehouse delete to a soft delete.
pub fn delete_outcome(stock_row_count: i64) -> DeleteOutcome {
    if stock_row_count > 0 {
        DeleteOutcome::Soft
    } else {
        DeleteOutcome::Hard
    }
}
