use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockdesk_core::{CategoryId, DomainError, DomainResult};

use crate::DeleteOutcome;

/// A node in the product category tree.
///
/// The tree is arena-style: nodes reference their parent by id, never by
/// pointer, so malformed data can at worst produce an id cycle — which the
/// reparenting check below detects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl NewCategory {
    pub fn validate(&self) -> DomainResult<()> {
        validate_slug(&self.slug)?;
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        Ok(())
    }

    pub fn into_category(self, id: CategoryId, now: DateTime<Utc>) -> Category {
        Category {
            id,
            slug: self.slug,
            name: self.name,
            parent_id: self.parent_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        Ok(())
    }

    pub fn apply(&self, category: &mut Category, now: DateTime<Utc>) {
        if let Some(slug) = &self.slug {
            category.slug = slug.clone();
        }
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            category.parent_id = *parent_id;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
        category.updated_at = now;
    }
}

fn validate_slug(slug: &str) -> DomainResult<()> {
    if slug.trim().is_empty() {
        return Err(DomainError::validation("slug is required"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::validation(
            "slug must contain only lowercase letters, digits and dashes",
        ));
    }
    Ok(())
}

/// Reject a reparenting that would create a cycle.
///
/// Walks the parent chain of `new_parent` in `parents` (id → parent id for
/// every category). A visited set bounds the walk even if the stored data
/// already contains a cycle.
pub fn ensure_no_cycle(
    category_id: CategoryId,
    new_parent: CategoryId,
    parents: &HashMap<CategoryId, Option<CategoryId>>,
) -> DomainResult<()> {
    if new_parent == category_id {
        return Err(DomainError::validation("category cannot be its own parent"));
    }

    let mut visited: HashSet<CategoryId> = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == category_id {
            return Err(DomainError::validation(
                "category cannot be moved under one of its descendants",
            ));
        }
        if !visited.insert(current) {
            // Pre-existing cycle in stored data; refuse to make it worse.
            return Err(DomainError::validation(
                "category parent chain contains a cycle",
            ));
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Ok(())
}

/// Decide how to delete a category: products or child categories keep it
/// alive as a soft delete.
pub fn delete_outcome(product_count: i64, child_count: i64) -> DeleteOutcome {
    if product_count > 0 || child_count > 0 {
        DeleteOutcome::Soft
    } else {
        DeleteOutcome::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pairs: &[(CategoryId, Option<CategoryId>)]) -> HashMap<CategoryId, Option<CategoryId>> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn self_parenting_rejected() {
        let id = CategoryId::new();
        let err = ensure_no_cycle(id, id, &HashMap::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn moving_under_descendant_rejected() {
        // root -> mid -> leaf; moving root under leaf closes a cycle.
        let root = CategoryId::new();
        let mid = CategoryId::new();
        let leaf = CategoryId::new();
        let parents = chain(&[(root, None), (mid, Some(root)), (leaf, Some(mid))]);

        let err = ensure_no_cycle(root, leaf, &parents).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn moving_to_unrelated_parent_allowed() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        let c = CategoryId::new();
        let parents = chain(&[(a, None), (b, None), (c, Some(b))]);

        assert!(ensure_no_cycle(a, c, &parents).is_ok());
    }

    #[test]
    fn corrupted_parent_chain_detected() {
        // x and y already point at each other.
        let x = CategoryId::new();
        let y = CategoryId::new();
        let z = CategoryId::new();
        let parents = chain(&[(x, Some(y)), (y, Some(x)), (z, None)]);

        let err = ensure_no_cycle(z, x, &parents).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn slug_shape_enforced() {
        let mut c = NewCategory {
            slug: "tools".into(),
            name: "Tools".into(),
            parent_id: None,
        };
        assert!(c.validate().is_ok());

        c.slug = "Power Tools".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn delete_outcome_depends_on_dependents() {
        assert_eq!(delete_outcome(0, 0), DeleteOutcome::Hard);
        assert_eq!(delete_outcome(1, 0), DeleteOutcome::Soft);
        assert_eq!(delete_outcome(0, 2), DeleteOutcome::Soft);
    }
}
