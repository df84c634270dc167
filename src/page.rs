//! Page-offset arithmetic shared by every paginated listing.

use serde::{Deserialize, Serialize};

/// Items per page for every listing.
pub const PAGE_SIZE: i64 = 10;

/// `?page=` query parameter. Kept as a string so junk input normalizes to
/// page 1 instead of being rejected by the extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: String,
}

fn default_page() -> String {
    "1".to_string()
}

/// Parses a requested page index. Anything unparsable or below 1 becomes 1.
pub fn page_index(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(1).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub item_count: i64,
    pub page_index: i64,
    pub page_size: i64,
    pub page_count: i64,
    pub offset: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    /// Builds the page window for `item_count` rows and a raw requested index.
    pub fn new(item_count: i64, requested: &str) -> Self {
        Self::with_size(item_count, page_index(requested), PAGE_SIZE)
    }

    pub fn with_size(item_count: i64, requested_index: i64, page_size: i64) -> Self {
        let item_count = item_count.max(0);
        let page_size = page_size.max(1);
        let page_count = ((item_count + page_size - 1) / page_size).max(1);
        let page_index = requested_index.clamp(1, page_count);

        Self {
            item_count,
            page_index,
            page_size,
            page_count,
            offset: (page_index - 1) * page_size,
            limit: page_size,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    /// No rows at all; callers skip the fetch and return an empty collection.
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}
