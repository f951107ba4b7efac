//! # Pagination
//!
//! Shared page request/response shapes for the listing operations
//! (stock listing, low stock, histories, debts).

use serde::{Deserialize, Serialize};

/// Page selector. `page` is 1-based; out-of-range values are clamped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: 10 }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page: page.max(1),
            limit: limit.clamp(1, 100),
        }
    }

    /// OFFSET for SQL.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit as i64
    }

    /// LIMIT for SQL.
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// One page of results plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, req: PageRequest) -> Self {
        let limit = req.limit.max(1) as i64;
        Page {
            data,
            meta: PageMeta {
                total,
                page: req.page,
                limit: req.limit,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let req = PageRequest::new(3, 20);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_page_clamping() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 100);
    }

    #[test]
    fn test_total_pages() {
        let page = Page::new(vec![1, 2, 3], 25, PageRequest::new(1, 10));
        assert_eq!(page.meta.total_pages, 3);
    }

    #[test]
    fn test_json_shape() {
        let page = Page::new(vec!["a", "b"], 2, PageRequest::default());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["data"][1], "b");
        assert_eq!(json["meta"]["total"], 2);
        assert_eq!(json["meta"]["total_pages"], 1);
    }
}
