//! Page slicing over ordered collections.

use serde::Serialize;

/// One page of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page, in collection order.
    pub items: Vec<T>,
    /// Zero-based page index that was requested.
    pub page: usize,
    /// Page size that was requested.
    pub per_page: usize,
    /// `ceil(count / per_page)`.
    pub total_pages: usize,
    /// Number of items in the whole collection.
    pub total_items: usize,
}

impl<T> Page<T> {
    /// Whether a following page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 0 && self.total_pages > 0
    }

    /// Offset of the first item of this page in the collection.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_mul(self.per_page)
    }

    /// Replaces the items, keeping the page geometry.
    #[must_use]
    pub fn map_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Total number of pages for `count` items.
#[must_use]
pub const fn total_pages(count: usize, per_page: usize) -> usize {
    if per_page == 0 {
        0
    } else {
        count.div_ceil(per_page)
    }
}

/// Slices `items` into page `page` of `per_page` items.
///
/// Out-of-range pages are empty, never an error.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let start = page.saturating_mul(per_page);
    let slice: &[T] = if per_page == 0 || start >= items.len() {
        &[][..]
    } else {
        let end = start.saturating_add(per_page).min(items.len());
        &items[start..end]
    };

    Page {
        items: slice.to_vec(),
        page,
        per_page,
        total_pages: total_pages(items.len(), per_page),
        total_items: items.len(),
    }
}
