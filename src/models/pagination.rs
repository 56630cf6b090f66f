use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_LIMIT;

/// Offset/limit window for read-side listings
///
/// The limit is capped at `MAX_PAGE_LIMIT`; a zero limit yields an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    offset: u32,
    limit: u32,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.min(MAX_PAGE_LIMIT),
        }
    }

    /// Create a page with only a limit
    pub fn limit_only(limit: u32) -> Self {
        Self::new(0, limit)
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Slice an already ordered collection
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, MAX_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_capped() {
        assert_eq!(Page::new(0, 500).limit(), MAX_PAGE_LIMIT);
        assert_eq!(Page::limit_only(10).limit(), 10);
    }

    #[test]
    fn test_apply_window() {
        let items: Vec<u32> = (1..=10).collect();
        assert_eq!(Page::new(2, 3).apply(&items), vec![3, 4, 5]);
        assert_eq!(Page::new(9, 5).apply(&items), vec![10]);
        assert!(Page::new(20, 5).apply(&items).is_empty());
        assert!(Page::new(0, 0).apply(&items).is_empty());
    }
}
