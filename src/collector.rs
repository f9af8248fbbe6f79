//! Ordered, deduplicating sink for index lines and pages.
//!
//! Indexing workers insert concurrently; the orchestrator harvests once all
//! of them are done. Both channels keep the first entry seen for a key and
//! silently drop later duplicates.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use crate::pages::PageEntry;

/// Sorted contents of a [`Collector`] at harvest time
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Harvest {
    /// Index lines, ascending, each ending in `\n`
    pub entries: Vec<String>,
    /// Pages, ascending by URL
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Default)]
pub struct Collector {
    /// Keyed by the full index line
    entries: Mutex<BTreeSet<String>>,
    /// Keyed by page URL
    pages: Mutex<BTreeMap<String, PageEntry>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an index line. Returns `false` if it was already present.
    pub fn insert_entry(&self, line: String) -> bool {
        self.entries.lock().insert(line)
    }

    /// Insert a page unless one with the same URL exists. Returns `false` on duplicates.
    pub fn insert_page(&self, page: PageEntry) -> bool {
        let mut pages = self.pages.lock();
        if pages.contains_key(&page.url) {
            return false;
        }
        pages.insert(page.url.clone(), page);
        true
    }

    /// Insert a batch of results from one worker
    pub fn extend(&self, entries: Vec<String>, pages: Vec<PageEntry>) {
        if !entries.is_empty() {
            let mut set = self.entries.lock();
            for line in entries {
                set.insert(line);
            }
        }
        if !pages.is_empty() {
            let mut map = self.pages.lock();
            for page in pages {
                map.entry(page.url.clone()).or_insert(page);
            }
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Take both sequences in ascending order, leaving the collector empty
    pub fn harvest(&self) -> Harvest {
        let entries = std::mem::take(&mut *self.entries.lock());
        let pages = std::mem::take(&mut *self.pages.lock());

        Harvest {
            entries: entries.into_iter().collect(),
            pages: pages.into_values().collect(),
        }
    }
}
