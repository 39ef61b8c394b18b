//! Fixed-size pages over an already ordered collection.
//!
//! Page numbers are 1-based. A missing or malformed `?page=` means page 1;
//! a number outside `1..=num_pages` is clamped to the nearest valid page, so
//! a non-empty collection never yields an empty page.

use serde::Serialize;

/// The page number a client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest(u64);

impl PageRequest {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// Parse the raw `page` query parameter.
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self(1);
        };

        match raw.parse::<i64>() {
            Ok(n) if n < 1 => Self(0),
            Ok(n) => Self(n as u64),
            // Too large for i64, still "past the end".
            Err(_) if raw.bytes().all(|b| b.is_ascii_digit()) => Self(u64::MAX),
            Err(_) => Self(1),
        }
    }

    pub fn number(&self) -> u64 {
        self.0
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self(1)
    }
}

/// Resolved position of a page within a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn new(total: u64, per_page: u64, request: PageRequest) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let number = request.number().clamp(1, num_pages);

        Self {
            number,
            num_pages,
            per_page,
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// One page of items plus what the templates need for prev/next links.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// `items` must already be the slice described by `window`.
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    /// Slice a fully loaded, already sorted collection.
    pub fn from_sorted(all: Vec<T>, per_page: u64, request: PageRequest) -> Self {
        let window = PageWindow::new(all.len() as u64, per_page, request);
        let items = all
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect();
        Self::from_window(items, window)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    pub fn next_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn previous_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }
}
