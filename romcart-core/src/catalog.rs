// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! The catalog store - a bounded, sorted, paginated list of ROM entries.
//!
//! The catalog is filled either by [`crate::scan`] (local storage) or
//! [`crate::remote`] (downloaded catalog).  Whichever ran last owns the
//! contents: both clear the catalog before populating it.

use core::cmp::Ordering;

use romcart_common::constants::{MAX_FILENAME_LENGTH, MAX_PATH_SIZE, MAX_ROMS, ROMS_PER_PAGE};

use crate::error::CapacityError;

/// Display name and tags.
pub type ShortText = heapless::String<MAX_FILENAME_LENGTH>;

/// Filenames, paths and descriptions.
pub type LongText = heapless::String<MAX_PATH_SIZE>;

/// Copies `text` into a bounded string, failing if it does not fit.
pub fn bounded<const N: usize>(
    text: &str,
    what: &'static str,
) -> Result<heapless::String<N>, CapacityError> {
    let mut out = heapless::String::new();
    out.push_str(text)
        .map_err(|_| CapacityError { what, capacity: N })?;
    Ok(out)
}

/// Copies as much of `text` as fits into a bounded string, cutting on a
/// character boundary.
pub fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Builds `folder/name` as a bounded path.
pub fn join_path<const N: usize>(
    folder: &str,
    name: &str,
) -> Result<heapless::String<N>, CapacityError> {
    let mut path: heapless::String<N> = bounded(folder.trim_end_matches('/'), "path")?;
    path.push('/')
        .and_then(|_| path.push_str(name))
        .map_err(|_| CapacityError {
            what: "path",
            capacity: N,
        })?;
    Ok(path)
}

/// Orders two names ignoring ASCII case.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|b| b.to_ascii_lowercase())
        .cmp(b.bytes().map(|b| b.to_ascii_lowercase()))
}

/// A ROM image known to the catalog.  Identified by `filename`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomEntry {
    /// Name of the image file inside the ROMs folder
    pub filename: LongText,

    /// Full storage path of the image
    pub path: LongText,

    /// Name shown in listings
    pub name: ShortText,

    pub description: LongText,

    pub tags: ShortText,

    /// Size in KB, as advertised by the remote catalog (0 for local images)
    pub size_kb: u32,
}

/// Result of (re)populating the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Population {
    /// Entries added
    pub added: usize,

    /// Candidates rejected (malformed lines, over-long names)
    pub skipped: usize,

    /// Population stopped early because the catalog was full
    pub overflow: bool,
}

/// One page of the catalog.  `start..end` indexes the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 0-based page number
    pub number: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub count: usize,
}

impl Page {
    pub fn has_next(&self) -> bool {
        self.number + 1 < self.count
    }

    pub fn has_prev(&self) -> bool {
        self.number > 0
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: heapless::Vec<RomEntry, MAX_ROMS>,
    page_size: usize,
    current_page: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_page_size(ROMS_PER_PAGE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: heapless::Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    /// Empties the catalog and returns to page 0
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_page = 0;
    }

    pub fn push(&mut self, entry: RomEntry) -> Result<(), CapacityError> {
        self.entries.push(entry).map_err(|_| CapacityError {
            what: "catalog",
            capacity: MAX_ROMS,
        })
    }

    /// Sorts by filename, ignoring case
    pub fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| cmp_ignore_case(&a.filename, &b.filename));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub fn get(&self, index: usize) -> Option<&RomEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[RomEntry] {
        &self.entries
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(len / page_size)`
    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    fn clamp_page(&self, page: usize) -> usize {
        page.min(self.page_count().saturating_sub(1))
    }

    /// Moves to `page`, clamped to the last page.  Returns the new page.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.current_page = self.clamp_page(page);
        self.current_page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.set_page(self.current_page.saturating_sub(1))
    }

    /// Bounds of `page`, clamped to the catalog
    pub fn page(&self, page: usize) -> Page {
        let number = self.clamp_page(page);
        let total = self.entries.len();
        let start = (number * self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        Page {
            number,
            start,
            end,
            total,
            count: self.page_count(),
        }
    }
}
