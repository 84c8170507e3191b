//! `stockdesk-catalog` — reference/master data domain.
//!
//! Products, categories, suppliers, customers, warehouses and organizations
//! share one lifecycle pattern: unique business key enforced before insert,
//! explicit optional-field patches on update, and delete falling back to a
//! soft delete (flip `is_active`) when dependent records exist.

pub mod category;
pub mod customer;
pub mod organization;
pub mod product;
pub mod supplier;
pub mod warehouse;

pub use category::{Category, CategoryPatch, NewCategory};
pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use organization::{NewOrganization, Organization, OrganizationPatch};
pub use product::{NewProduct, Product, ProductPatch};
pub use supplier::{NewSupplier, Supplier, SupplierPatch};
pub use warehouse::{NewWarehouse, Warehouse, WarehousePatch};

/// How a delete request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    /// Dependents exist: the record was deactivated, not removed.
    Soft,
    /// No dependents: the record was removed.
    Hard,
}

impl DeleteOutcome {
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Soft)
    }
}
