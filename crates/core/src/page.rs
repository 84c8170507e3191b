//! Offset-based pagination primitives.

use serde::{Deserialize, Serialize};

/// Default page size when the caller supplies none.
pub const DEFAULT_LIMIT: i64 = 50;

/// Raw pagination parameters as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Resolve to a concrete `(limit, offset)`, clamping the limit into
    /// `1..=max` and the offset to be non-negative.
    pub fn resolve(&self, max_limit: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, max_limit);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// One page of results plus enough metadata for the caller to keep paging.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        let has_more = offset + (data.len() as i64) < total;
        Self {
            data,
            total,
            limit,
            offset,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_default_and_cap() {
        let q = PageQuery::default();
        assert_eq!(q.resolve(100), (DEFAULT_LIMIT, 0));

        let q = PageQuery {
            limit: Some(9_999),
            offset: Some(-5),
        };
        assert_eq!(q.resolve(100), (100, 0));

        let q = PageQuery {
            limit: Some(0),
            offset: Some(10),
        };
        assert_eq!(q.resolve(100), (1, 10));
    }

    #[test]
    fn has_more_accounts_for_offset_and_returned_rows() {
        let page = Page::new(vec![1, 2, 3], 10, 3, 0);
        assert!(page.has_more);

        let page = Page::new(vec![1, 2, 3], 10, 3, 7);
        assert!(!page.has_more);

        let page: Page<i32> = Page::new(vec![], 0, 50, 0);
        assert!(!page.has_more);
    }
}
