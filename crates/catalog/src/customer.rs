use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockdesk_core::{CustomerId, DomainError, DomainResult};

use crate::DeleteOutcome;

/// A customer sales orders are placed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_exempt: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tax_exempt: bool,
}

impl NewCustomer {
    pub fn validate(&self) -> DomainResult<()> {
        validate_code_and_name(&self.code, &self.name)
    }

    pub fn into_customer(self, id: CustomerId, now: DateTime<Utc>) -> Customer {
        Customer {
            id,
            code: self.code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            tax_exempt: self.tax_exempt,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub phone: Option<Option<String>>,
    pub tax_exempt: Option<bool>,
    pub is_active: Option<bool>,
}

impl CustomerPatch {
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

    pub fn apply(&self, customer: &mut Customer, now: DateTime<Utc>) {
        if let Some(code) = &self.code {
            customer.code = code.clone();
        }
        if let Some(name) = &self.name {
            customer.name = name.clone();
        }
        if let Some(email) = &self.email {
            customer.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            customer.phone = phone.clone();
        }
        if let Some(tax_exempt) = self.tax_exempt {
            customer.tax_exempt = tax_exempt;
        }
        if let Some(is_active) = self.is_active {
            customer.is_active = is_active;
        }
        customer.updated_at = now;
    }
}

pub(crate) fn validate_code_and_name(code: &str, name: &str) -> DomainResult<()> {
    if code.trim().is_empty() {
        return Err(DomainError::validation("code is required"));
    }
    if name.trim().is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    Ok(())
}

/// Existing orders downgrade a customer delete to a soft delete.
pub fn delete_outcome(order_count: i64) -> DeleteOutcome {
    if order_count > 0 {
        DeleteOutcome::Soft
    } else {
        DeleteOutcome::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_can_clear_contact_fields() {
        let now = Utc::now();
        let mut customer = NewCustomer {
            code: "C-1".into(),
            name: "Acme".into(),
            email: Some("ops@acme.test".into()),
            phone: None,
            tax_exempt: false,
        }
        .into_customer(CustomerId::new(), now);

        let patch = CustomerPatch {
            email: Some(None),
            ..Default::default()
        };
        patch.apply(&mut customer, now);

        assert_eq!(customer.email, None);
        assert_eq!(customer.code, "C-1");
    }

    #[test]
    fn delete_with_orders_is_soft() {
        assert_eq!(delete_outcome(4), DeleteOutcome::Soft);
        assert_eq!(delete_outcome(0), DeleteOutcome::Hard);
    }
}
