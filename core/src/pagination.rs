//! Page/limit handling for list endpoints.

use serde::{Deserialize, Serialize};

/// One-based page selection.
///
/// Non-positive or unparsable input silently falls back to the defaults
/// (page 1, limit 10).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Default page number
    pub const DEFAULT_PAGE: u32 = 1;
    /// Default page size
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Builds a pagination from raw numbers, replacing non-positive values.
    #[must_use]
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: positive_or(page, Self::DEFAULT_PAGE),
            limit: positive_or(limit, Self::DEFAULT_LIMIT),
        }
    }

    /// Builds a pagination from raw query-string values.
    #[must_use]
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
        Self::new(parse(page), parse(limit))
    }

    /// One-based page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

fn positive_or(value: i64, default: u32) -> u32 {
    if value <= 0 {
        return default;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}
