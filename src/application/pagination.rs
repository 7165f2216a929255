//! Numbered-page pagination helpers.

use std::num::NonZeroU32;

/// A request for one page of results. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: NonZeroU32,
    page_size: NonZeroU32,
}

impl PageRequest {
    pub fn new(page: NonZeroU32, page_size: NonZeroU32) -> Self {
        Self { page, page_size }
    }

    /// Build a request from a raw page number, treating `0` as the first page.
    pub fn from_page(page: u32, page_size: NonZeroU32) -> Self {
        Self::new(NonZeroU32::new(page).unwrap_or(NonZeroU32::MIN), page_size)
    }

    pub fn page(&self) -> u32 {
        self.page.get()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    pub fn offset(&self) -> usize {
        (self.page.get() as usize - 1).saturating_mul(self.page_size.get() as usize)
    }

    pub fn limit(&self) -> usize {
        self.page_size.get() as usize
    }
}

/// A page of items plus the total number of matches across all pages.
#[derive(Debug, Clone)]
pub struct CountedPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> CountedPage<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

/// Number of pages needed for `total` items; an empty result still has one page.
pub fn total_pages(total: u64, page_size: NonZeroU32) -> u32 {
    let pages = total.div_ceil(u64::from(page_size.get())).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Clamp `page` into `1..=total_pages`.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).expect("non-zero")
    }

    #[test]
    fn offset_skips_previous_pages() {
        let request = PageRequest::from_page(3, size(12));
        assert_eq!(request.offset(), 24);
        assert_eq!(request.limit(), 12);
    }

    #[test]
    fn zero_page_means_first_page() {
        assert_eq!(PageRequest::from_page(0, size(5)).page(), 1);
    }

    #[test]
    fn total_pages_rounds_up_and_never_hits_zero() {
        assert_eq!(total_pages(0, size(12)), 1);
        assert_eq!(total_pages(12, size(12)), 1);
        assert_eq!(total_pages(13, size(12)), 2);
    }

    #[test]
    fn clamp_keeps_page_in_range() {
        assert_eq!(clamp_page(0, 4), 1);
        assert_eq!(clamp_page(9, 4), 4);
        assert_eq!(clamp_page(2, 0), 1);
    }
}
