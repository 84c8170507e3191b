//! Request/response DTOs and JSON mapping helpers.
//!
//! Domain input types (`NewProduct`, `ProductPatch`, ...) deserialize
//! directly from request bodies; this module only holds the shapes that
//! need delivery-layer interpretation before they reach the domain.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use stockdesk_audit::{AuditAction, AuditEntityType};
use stockdesk_catalog::DeleteOutcome;
use stockdesk_core::{
    CategoryId, CustomerId, DomainError, DomainResult, OrganizationId, PageQuery, ProductId,
    SupplierId, UserId, WarehouseId,
};
use stockdesk_purchasing::{PurchaseOrderStatus, ReceiptRequest};
use stockdesk_sales::{OrderPatch, OrderStatus};
use stockdesk_stock::{QuantityWrite, StockWrite};
use stockdesk_store::{
    AuditFilter, BulkStockResult, BulkStockWrite, OrderFilter, ProductFilter, PurchaseOrderFilter,
    StockFilter,
};

/// One stock write: at most one of `quantity` (absolute) or `adjustment`
/// (signed delta); a body carrying only `reserved_qty` leaves the on-hand
/// quantity untouched.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StockWriteRequest {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub adjustment: Option<i64>,
    #[serde(default)]
    pub reserved_qty: Option<i64>,
    #[serde(default)]
    pub is_count: bool,
}

impl StockWriteRequest {
    pub fn into_write(self) -> DomainResult<StockWrite> {
        let quantity = match (self.quantity, self.adjustment) {
            (Some(q), None) => QuantityWrite::Set(q),
            (None, Some(delta)) => QuantityWrite::Adjust(delta),
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "provide either quantity or adjustment, not both",
                ));
            }
            // A reservation-only change still has to pass the domain's
            // reserved <= quantity check against the current level.
            (None, None) if self.reserved_qty.is_some() => QuantityWrite::Adjust(0),
            (None, None) => {
                return Err(DomainError::validation(
                    "one of quantity, adjustment or reserved_qty is required",
                ));
            }
        };
        Ok(StockWrite {
            quantity,
            reserved_qty: self.reserved_qty,
            is_count: self.is_count,
        })
    }
}

/// One line of a bulk stock request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BulkStockItemRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    #[serde(flatten)]
    pub write: StockWriteRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStockRequest {
    pub items: Vec<BulkStockItemRequest>,
}

impl BulkStockRequest {
    pub fn into_writes(self) -> DomainResult<Vec<BulkStockWrite>> {
        if self.items.is_empty() {
            return Err(DomainError::validation("items must not be empty"));
        }
        self.items
            .into_iter()
            .map(|item| {
                Ok(BulkStockWrite {
                    product_id: item.product_id,
                    warehouse_id: item.warehouse_id,
                    write: item.write.into_write()?,
                })
            })
            .collect()
    }
}

/// Per-item bulk response line.
pub fn bulk_result_to_json(result: &BulkStockResult) -> serde_json::Value {
    match &result.result {
        Ok(record) => json!({
            "product_id": result.product_id,
            "warehouse_id": result.warehouse_id,
            "ok": true,
            "record": record,
        }),
        Err(err) => json!({
            "product_id": result.product_id,
            "warehouse_id": result.warehouse_id,
            "ok": false,
            "error": err.to_string(),
        }),
    }
}

/// Body for `POST /purchase-orders/:id/receive`.
///
/// Omitting `items` receives every open line in full.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveRequest {
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub items: Option<Vec<ReceiptRequest>>,
}

/// Body for `PATCH /orders/:id`. Items are immutable after creation, so a
/// request that mentions them is rejected outright rather than ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdateRequest {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub items: Option<serde_json::Value>,
}

impl OrderUpdateRequest {
    pub fn into_patch(self) -> DomainResult<OrderPatch> {
        if self.items.is_some() {
            return Err(DomainError::validation(
                "order items cannot be modified after creation",
            ));
        }
        Ok(OrderPatch {
            status: self.status,
            notes: self.notes,
        })
    }
}

/// Body of a successful DELETE.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub soft_deleted: bool,
}

impl DeleteResponse {
    pub fn from_outcome(id: Uuid, outcome: DeleteOutcome) -> Self {
        Self {
            id,
            soft_deleted: outcome.is_soft(),
        }
    }

    pub fn hard(id: Uuid) -> Self {
        Self {
            id,
            soft_deleted: false,
        }
    }
}

// Listing query parameters, one struct per collection endpoint.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl ProductListQuery {
    pub fn split(self) -> (ProductFilter, PageQuery) {
        (
            ProductFilter {
                organization_id: self.organization_id,
                category_id: self.category_id,
                is_active: self.is_active,
                search: self.search,
            },
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CategoryListQuery {
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl CategoryListQuery {
    pub fn split(self) -> (Option<CategoryId>, PageQuery) {
        (
            self.parent_id,
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ActiveListQuery {
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl ActiveListQuery {
    pub fn split(self) -> (Option<bool>, PageQuery) {
        (
            self.is_active,
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WarehouseListQuery {
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl WarehouseListQuery {
    pub fn split(self) -> (Option<OrganizationId>, PageQuery) {
        (
            self.organization_id,
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StockListQuery {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl StockListQuery {
    pub fn split(self) -> (StockFilter, PageQuery) {
        (
            StockFilter {
                product_id: self.product_id,
                warehouse_id: self.warehouse_id,
            },
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PurchaseOrderListQuery {
    #[serde(default)]
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl PurchaseOrderListQuery {
    pub fn split(self) -> (PurchaseOrderFilter, PageQuery) {
        (
            PurchaseOrderFilter {
                status: self.status,
                supplier_id: self.supplier_id,
            },
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl OrderListQuery {
    pub fn split(self) -> (OrderFilter, PageQuery) {
        (
            OrderFilter {
                status: self.status,
                customer_id: self.customer_id,
            },
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AuditListQuery {
    #[serde(default)]
    pub entity_type: Option<AuditEntityType>,
    #[serde(default)]
    pub entity_id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl AuditListQuery {
    pub fn split(self) -> (AuditFilter, PageQuery) {
        (
            AuditFilter {
                entity_type: self.entity_type,
                entity_id: self.entity_id,
                user_id: self.user_id,
                action: self.action,
            },
            PageQuery {
                limit: self.limit,
                offset: self.offset,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_write_requires_exactly_one_quantity_mode() {
        let absolute: StockWriteRequest = serde_json::from_str(r#"{"quantity": 5}"#).unwrap();
        assert_eq!(
            absolute.into_write().unwrap().quantity,
            QuantityWrite::Set(5)
        );

        let relative: StockWriteRequest = serde_json::from_str(r#"{"adjustment": -3}"#).unwrap();
        assert_eq!(
            relative.into_write().unwrap().quantity,
            QuantityWrite::Adjust(-3)
        );

        let both: StockWriteRequest =
            serde_json::from_str(r#"{"quantity": 5, "adjustment": 1}"#).unwrap();
        assert!(both.into_write().is_err());

        let neither: StockWriteRequest = serde_json::from_str(r#"{"is_count": true}"#).unwrap();
        assert!(neither.into_write().is_err());
    }

    #[test]
    fn reserved_only_write_keeps_quantity_untouched() {
        let req: StockWriteRequest = serde_json::from_str(r#"{"reserved_qty": 3}"#).unwrap();
        let write = req.into_write().unwrap();
        assert_eq!(write.quantity, QuantityWrite::Adjust(0));
        assert_eq!(write.reserved_qty, Some(3));
    }

    #[test]
    fn reserved_only_write_reaches_domain_reservation_check() {
        // Reserving more than the current on-hand level must surface the
        // domain error, not a missing-quantity complaint.
        let req: StockWriteRequest = serde_json::from_str(r#"{"reserved_qty": 10}"#).unwrap();
        let write = req.into_write().unwrap();
        let level = stockdesk_stock::StockLevel {
            quantity: 5,
            reserved_qty: 0,
            last_count_at: None,
        };
        let err = write.apply(&level, chrono::Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn order_update_rejects_item_edits() {
        let req: OrderUpdateRequest =
            serde_json::from_str(r#"{"status": "confirmed", "items": []}"#).unwrap();
        let err = req.into_patch().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let req: OrderUpdateRequest = serde_json::from_str(r#"{"status": "confirmed"}"#).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.status, Some(OrderStatus::Confirmed));
        assert!(patch.notes.is_none());
    }

    #[test]
    fn order_update_notes_distinguish_absent_and_null() {
        let req: OrderUpdateRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(req.into_patch().unwrap().notes, Some(None));

        let req: OrderUpdateRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(req.into_patch().unwrap().notes, None);
    }

    #[test]
    fn bulk_request_must_not_be_empty() {
        let req = BulkStockRequest { items: vec![] };
        assert!(req.into_writes().is_err());
    }
}
