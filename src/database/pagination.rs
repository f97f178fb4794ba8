use serde::{Deserialize, Serialize};

use crate::constants::MAX_COUNT_PER_PAGE;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

/// Raw `page` / `limit` query parameters.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn resolve(&self, default_size: i64) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_size),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Pages are 1-based; the size is clamped to `1..=MAX_COUNT_PER_PAGE`.
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_COUNT_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let page_count = (total_rows + request.size - 1) / request.size;

        let next = (request.page < page_count).then(|| request.page + 1);
        let previous = (request.page > 1).then(|| (request.page - 1).min(page_count.max(1)));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_both_ways() {
        let page = Page::from_rows(vec![4, 5, 6], 10, PageRequest::new(2, 3));

        assert_eq!(page.count, 10);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::from_rows(vec![10], 10, PageRequest::new(4, 3));

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));
    }

    #[test]
    fn page_past_the_end_points_back_to_last_page() {
        let page: Page<i32> = Page::from_rows(vec![], 4, PageRequest::new(9, 2));

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
        assert!(page.results.is_empty());
    }

    #[test]
    fn request_is_clamped() {
        let request = PageQuery {
            page: Some(0),
            limit: Some(1_000),
        }
        .resolve(6);

        assert_eq!(request, PageRequest::new(1, MAX_COUNT_PER_PAGE));
        assert_eq!(request.offset(), 0);
        assert_eq!(PageQuery::default().resolve(6).size, 6);
    }
}
