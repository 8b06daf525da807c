//! Page-number pagination over ordered sequences.
//!
//! Requests are tolerant: a missing, malformed or non-positive page number
//! selects the first page, and a number past the end selects the last page.
//! An empty sequence still has one (empty) page.

use std::num::NonZeroU32;

use crate::application::repos::PageWindow;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A requested 1-based page number, before clamping against a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(u64);

impl PageNumber {
    pub const FIRST: Self = Self(1);

    pub fn new(value: u64) -> Self {
        Self(value.max(1))
    }

    /// Parse the raw `page` query value.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::FIRST;
        };

        match value.parse::<u64>() {
            Ok(number) => Self::new(number),
            // Digits that overflow still mean "far past the end".
            Err(_) if value.bytes().all(|byte| byte.is_ascii_digit()) => Self(u64::MAX),
            Err(_) => Self::FIRST,
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            per_page: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u64 {
        u64::from(self.per_page.get())
    }

    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page()).max(1)
    }

    /// Resolve the page actually served for `requested` out of `total` items.
    pub fn locate(&self, total: u64, requested: PageNumber) -> PageMeta {
        let page_count = self.page_count(total);
        PageMeta {
            total,
            number: requested.get().clamp(1, page_count),
            page_count,
            per_page: self.per_page(),
        }
    }

    /// Slice an in-memory ordered sequence.
    pub fn paginate<T: Clone>(&self, items: &[T], requested: PageNumber) -> Page<T> {
        let meta = self.locate(items.len() as u64, requested);
        let window = meta.window();
        let start = usize::try_from(window.offset)
            .unwrap_or(usize::MAX)
            .min(items.len());
        let end = start
            .saturating_add(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .min(items.len());
        Page {
            items: items[start..end].to_vec(),
            meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub number: u64,
    pub page_count: u64,
    pub per_page: u64,
}

impl PageMeta {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.per_page)
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: self.offset(),
            limit: self.per_page,
        }
    }

    /// 1-based index of the first item on this page, `0` when empty.
    pub fn start_index(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.offset() + 1
        }
    }

    /// 1-based index of the last item on this page.
    pub fn end_index(&self) -> u64 {
        if self.number == self.page_count {
            self.total
        } else {
            self.number * self.per_page
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
