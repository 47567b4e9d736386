//! Offset pagination primitives for list endpoints.

use serde::Serialize;

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const MAX_PER_PAGE: u32 = 100;

/// Requested page window, already clamped to supported bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetPage {
    pub page: u32,
    pub per_page: u32,
}

impl Default for OffsetPage {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl OffsetPage {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of results together with the totals clients use to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: OffsetPage, total: u64) -> Self {
        let last_page = total.div_ceil(u64::from(request.per_page)).max(1);
        Self {
            items,
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_bounds() {
        let page = OffsetPage::new(Some(0), Some(500));
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, MAX_PER_PAGE);

        let page = OffsetPage::new(None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn offset_follows_page_number() {
        let page = OffsetPage::new(Some(3), Some(15));
        assert_eq!(page.offset(), 30);
        assert_eq!(page.limit(), 15);
    }

    #[test]
    fn last_page_rounds_up_and_never_hits_zero() {
        let page = Page::new(Vec::<u8>::new(), OffsetPage::new(Some(1), Some(15)), 31);
        assert_eq!(page.last_page, 3);

        let empty = Page::new(Vec::<u8>::new(), OffsetPage::default(), 0);
        assert_eq!(empty.last_page, 1);
    }
}
