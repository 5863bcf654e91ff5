//! Pagination utilities for listing endpoints
//!
//! Cards are listed 18 per page, sets 24 per page.

use serde::Serialize;

pub const CARDS_PAGE_SIZE: i64 = 18;
pub const SETS_PAGE_SIZE: i64 = 24;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub per_page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Total number of rows
    pub total: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// Out-of-range pages are clamped to [1, total_pages].
///
/// # Examples
/// ```
/// use cardvault_admin::pagination::calculate_pagination;
///
/// let p = calculate_pagination(40, 2, 18);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 18);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, per_page: i64) -> Pagination {
    let per_page = per_page.max(1);
    let total_pages = (total_results + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * per_page;

    Pagination {
        page,
        per_page,
        total_pages,
        total: total_results,
        offset,
    }
}

/// A page of rows plus its pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(flatten)]
    pub pagination: Pagination,
}
