use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockdesk_core::{DomainError, DomainResult, OrganizationId};

use crate::DeleteOutcome;

/// A tenant organization; products and warehouses hang off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub slug: String,
    pub name: String,
}

impl NewOrganization {
    pub fn validate(&self) -> DomainResult<()> {
        if self.slug.trim().is_empty() {
            return Err(DomainError::validation("slug is required"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        Ok(())
    }

    pub fn into_organization(self, id: OrganizationId, now: DateTime<Utc>) -> Organization {
        Organization {
            id,
            slug: self.slug,
            name: self.name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl OrganizationPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(slug) = &self.slug {
            if slug.trim().is_empty() {
                return Err(DomainError::validation("slug must not be empty"));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        Ok(())
    }

    pub fn apply(&self, organization: &mut Organization, now: DateTime<Utc>) {
        if let Some(slug) = &self.slug {
            organization.slug = slug.clone();
        }
        if let Some(name) = &self.name {
            organization.name = name.clone();
        }
        if let Some(is_active) = self.is_active {
            organization.is_active = is_active;
        }
        organization.updated_at = now;
    }
}

/// Products or warehouses keep an organization alive as a soft delete.
pub fn delete_outcome(product_count: i64, warehouse_count: i64) -> DeleteOutcome {
    if product_count > 0 || warehouse_count > 0 {
        DeleteOutcome::Soft
    } else {
        DeleteOutcome::Hard
    }
}
