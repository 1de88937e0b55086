use crate::config::EngineConfig;

/// A page request after clamping.
///
/// Pages are 1-based. A page below 1 becomes 1, a limit below 1 becomes 1 and a
/// limit above the configured maximum is clamped to it, silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Clamps `page` and `limit` against `max_limit`. A missing limit uses
    /// `default_limit` (itself clamped).
    pub fn new(page: u64, limit: Option<u64>, default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.max(1);
        let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
        PageRequest {
            page: page.max(1),
            limit,
        }
    }

    pub fn from_config(page: u64, limit: Option<u64>, config: &EngineConfig) -> Self {
        PageRequest::new(
            page,
            limit,
            config.default_page_limit(),
            config.max_page_limit(),
        )
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// The clamped limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records before this page: `(page - 1) * limit`.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// The envelope every paginated list operation returns.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        Paginated {
            data,
            total,
            page: request.page(),
            limit: request.limit(),
            total_pages: request.total_pages(total),
        }
    }

    /// An empty page for `request`.
    pub fn empty(request: PageRequest) -> Self {
        Paginated::new(Vec::new(), 0, request)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}
