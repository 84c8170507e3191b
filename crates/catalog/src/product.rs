use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockdesk_core::{CategoryId, DomainError, DomainResult, OrganizationId, ProductId};

use crate::DeleteOutcome;

/// A sellable/purchasable product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub min_stock_level: i64,
    pub reorder_point: i64,
    pub is_taxable: bool,
    pub is_active: bool,
    pub organization_id: OrganizationId,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub min_stock_level: i64,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub is_taxable: bool,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku is required"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        validate_amounts(
            self.unit_price,
            self.cost_price,
            self.min_stock_level,
            self.reorder_point,
        )
    }

    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            sku: self.sku,
            name: self.name,
            description: self.description,
            unit_price: self.unit_price,
            cost_price: self.cost_price,
            min_stock_level: self.min_stock_level,
            reorder_point: self.reorder_point,
            is_taxable: self.is_taxable,
            is_active: true,
            organization_id: self.organization_id,
            category_id: self.category_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update: absent fields are left untouched. `category_id` is
/// nullable, so it is doubly optional (absent = keep, `null` = clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub description: Option<Option<String>>,
    pub unit_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub min_stock_level: Option<i64>,
    pub reorder_point: Option<i64>,
    pub is_taxable: Option<bool>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub category_id: Option<Option<CategoryId>>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(sku) = &self.sku {
            if sku.trim().is_empty() {
                return Err(DomainError::validation("sku must not be empty"));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        validate_amounts(
            self.unit_price.unwrap_or_default(),
            self.cost_price.unwrap_or_default(),
            self.min_stock_level.unwrap_or_default(),
            self.reorder_point.unwrap_or_default(),
        )
    }

    /// Whether the patch changes the unique business key.
    pub fn sku_change(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(sku) = &self.sku {
            product.sku = sku.clone();
        }
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(unit_price) = self.unit_price {
            product.unit_price = unit_price;
        }
        if let Some(cost_price) = self.cost_price {
            product.cost_price = cost_price;
        }
        if let Some(min_stock_level) = self.min_stock_level {
            product.min_stock_level = min_stock_level;
        }
        if let Some(reorder_point) = self.reorder_point {
            product.reorder_point = reorder_point;
        }
        if let Some(is_taxable) = self.is_taxable {
            product.is_taxable = is_taxable;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(category_id) = &self.category_id {
            product.category_id = *category_id;
        }
        product.updated_at = now;
    }
}

fn validate_amounts(
    unit_price: Decimal,
    cost_price: Decimal,
    min_stock_level: i64,
    reorder_point: i64,
) -> DomainResult<()> {
    if unit_price < Decimal::ZERO {
        return Err(DomainError::validation("unit_price must not be negative"));
    }
    if cost_price < Decimal::ZERO {
        return Err(DomainError::validation("cost_price must not be negative"));
    }
    if min_stock_level < 0 {
        return Err(DomainError::validation(
            "min_stock_level must not be negative",
        ));
    }
    if reorder_point < 0 {
        return Err(DomainError::validation("reorder_point must not be negative"));
    }
    Ok(())
}

/// Dependent-record counts consulted when deleting a product.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductDependents {
    /// Sum of on-hand quantity across all warehouses.
    pub stock_on_hand: i64,
    /// Sales order lines referencing the product.
    pub order_items: i64,
    /// Purchase order lines referencing the product.
    pub purchase_order_items: i64,
}

/// Decide how to delete a product.
///
/// Positive stock always blocks the delete; order references downgrade it
/// to a soft delete.
pub fn delete_outcome(deps: ProductDependents) -> DomainResult<DeleteOutcome> {
    if deps.stock_on_hand > 0 {
        return Err(DomainError::dependency_exists(
            "product has stock on hand; adjust stock to zero before deleting",
        ));
    }
    if deps.order_items > 0 || deps.purchase_order_items > 0 {
        Ok(DeleteOutcome::Soft)
    } else {
        Ok(DeleteOutcome::Hard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockdesk_core::OrganizationId;

    fn new_product() -> NewProduct {
        NewProduct {
            sku: "SKU-1".into(),
            name: "Widget".into(),
            description: None,
            unit_price: Decimal::new(1000, 2),
            cost_price: Decimal::new(600, 2),
            min_stock_level: 0,
            reorder_point: 5,
            is_taxable: true,
            organization_id: OrganizationId::new(),
            category_id: None,
        }
    }

    #[test]
    fn create_requires_sku_and_name() {
        let mut p = new_product();
        p.sku = "  ".into();
        assert!(matches!(p.validate(), Err(DomainError::Validation(_))));

        let mut p = new_product();
        p.name = String::new();
        assert!(matches!(p.validate(), Err(DomainError::Validation(_))));

        assert!(new_product().validate().is_ok());
    }

    #[test]
    fn negative_prices_rejected() {
        let mut p = new_product();
        p.unit_price = Decimal::new(-1, 2);
        assert!(p.validate().is_err());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let now = Utc::now();
        let mut product = new_product().into_product(ProductId::new(), now);
        product.category_id = Some(CategoryId::new());

        let patch = ProductPatch {
            name: Some("Widget v2".into()),
            category_id: Some(None),
            ..Default::default()
        };
        patch.apply(&mut product, now);

        assert_eq!(product.name, "Widget v2");
        assert_eq!(product.sku, "SKU-1");
        assert_eq!(product.category_id, None);
    }

    #[test]
    fn delete_with_order_reference_and_no_stock_is_soft() {
        let outcome = delete_outcome(ProductDependents {
            stock_on_hand: 0,
            order_items: 1,
            purchase_order_items: 0,
        })
        .unwrap();
        assert_eq!(outcome, DeleteOutcome::Soft);
    }

    #[test]
    fn delete_with_positive_stock_is_blocked() {
        let err = delete_outcome(ProductDependents {
            stock_on_hand: 3,
            order_items: 0,
            purchase_order_items: 0,
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::DependencyExists(_)));
    }

    #[test]
    fn delete_without_dependents_is_hard() {
        let outcome = delete_outcome(ProductDependents::default()).unwrap();
        assert_eq!(outcome, DeleteOutcome::Hard);
    }
}
