//! Shared cursor pagination
//!
//! Forward-only pagination keyed on a strictly monotonic, unique id (never
//! a mutable or non-unique column), so concurrent inserts cannot skip or
//! duplicate rows across pages. List queries filter `id > cursor`, order by
//! id, and build the response page with [`CursorPage::from_rows`].
//!
//! `total` is a best-effort count, not transactionally consistent with the
//! returned page; termination is signalled by an absent `next_cursor`, which
//! stays correct even when the count is stale.

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not pass a limit.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Server-side ceiling for caller-supplied limits.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Cursor pagination request parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CursorParams {
    /// Exclusive lower bound: return rows with `id > cursor`. Absent means
    /// start at the beginning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,

    /// Page size. Defaults to 20, clamped to 1-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl CursorParams {
    /// Create new cursor parameters
    pub fn new(cursor: Option<i64>, limit: Option<i64>) -> Self {
        Self { cursor, limit }
    }

    /// Effective page size, defaulted and clamped server-side
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Validate cursor parameters
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(cursor) = self.cursor {
            if cursor < 0 {
                return Err("Cursor must not be negative");
            }
        }
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                return Err("Limit must be between 1 and 100");
            }
        }
        Ok(())
    }
}

/// One page of a cursor-paginated collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// Best-effort total count of the underlying collection
    pub total: i64,

    /// Items for this page, in ascending id order
    pub items: Vec<T>,

    /// Cursor for the next page: the id of the last item returned, absent
    /// when the page is short (end of collection)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
}

impl<T> CursorPage<T> {
    /// Build a page from fetched rows.
    ///
    /// `id_of` extracts the pagination key from a row; the rows must already
    /// be in ascending key order and at most `limit` long.
    pub fn from_rows(items: Vec<T>, total: i64, limit: i64, id_of: impl Fn(&T) -> i64) -> Self {
        let next_cursor = if (items.len() as i64) < limit {
            None
        } else {
            items.last().map(id_of)
        };

        Self {
            total,
            items,
            next_cursor,
        }
    }

    /// Map items to a different type
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> CursorPage<U> {
        CursorPage {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
