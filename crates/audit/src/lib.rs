//! `stockdesk-audit` — append-only audit trail domain.
//!
//! Every catalog mutation and workflow operation records one entry keyed by
//! entity type + id with a before/after snapshot. Entries are never updated
//! or deleted, and a failed audit write never unwinds the operation that
//! produced it.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockdesk_core::{AuditLogId, DomainError, UserId};

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(DomainError::validation(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// The kind of entity an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    Organization,
    Category,
    Product,
    Supplier,
    Customer,
    Warehouse,
    StockItem,
    PurchaseOrder,
    Order,
}

impl AuditEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Category => "category",
            Self::Product => "product",
            Self::Supplier => "supplier",
            Self::Customer => "customer",
            Self::Warehouse => "warehouse",
            Self::StockItem => "stock_item",
            Self::PurchaseOrder => "purchase_order",
            Self::Order => "order",
        }
    }
}

impl core::fmt::Display for AuditEntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(Self::Organization),
            "category" => Ok(Self::Category),
            "product" => Ok(Self::Product),
            "supplier" => Ok(Self::Supplier),
            "customer" => Ok(Self::Customer),
            "warehouse" => Ok(Self::Warehouse),
            "stock_item" => Ok(Self::StockItem),
            "purchase_order" => Ok(Self::PurchaseOrder),
            "order" => Ok(Self::Order),
            other => Err(DomainError::validation(format!(
                "unknown audit entity type: {other}"
            ))),
        }
    }
}

/// Before/after snapshot attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

impl ChangeSet {
    pub fn created<T: Serialize>(after: &T) -> Self {
        Self {
            before: None,
            after: serde_json::to_value(after).ok(),
        }
    }

    pub fn updated<B: Serialize, A: Serialize>(before: &B, after: &A) -> Self {
        Self {
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(after).ok(),
        }
    }

    pub fn deleted<T: Serialize>(before: &T) -> Self {
        Self {
            before: serde_json::to_value(before).ok(),
            after: None,
        }
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: AuditLogId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Uuid,
    pub changes: ChangeSet,
    pub created_at: DateTime<Utc>,
}

/// A to-be-written audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Uuid,
    pub changes: ChangeSet,
}

impl NewAuditEntry {
    pub fn new(
        user_id: UserId,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: Uuid,
        changes: ChangeSet,
    ) -> Self {
        Self {
            user_id,
            action,
            entity_type,
            entity_id,
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_set_shapes() {
        #[derive(Serialize)]
        struct Snap {
            quantity: i64,
        }

        let created = ChangeSet::created(&Snap { quantity: 5 });
        assert!(created.before.is_none());
        assert_eq!(created.after.unwrap()["quantity"], 5);

        let updated = ChangeSet::updated(&Snap { quantity: 5 }, &Snap { quantity: 9 });
        assert_eq!(updated.before.unwrap()["quantity"], 5);
        assert_eq!(updated.after.unwrap()["quantity"], 9);

        let deleted = ChangeSet::deleted(&Snap { quantity: 9 });
        assert!(deleted.after.is_none());
    }

    #[test]
    fn action_and_entity_type_round_trip() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert_eq!(
            "purchase_order".parse::<AuditEntityType>().unwrap(),
            AuditEntityType::PurchaseOrder
        );
        assert!("invoice".parse::<AuditEntityType>().is_err());
    }
}
