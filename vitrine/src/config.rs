use crate::common::{DEFAULT_MAX_PAGE_LIMIT, DEFAULT_PAGE_LIMIT, DEFAULT_RELATED_LIMIT, DEFAULT_SORT};
use crate::errors::{ErrorKind, VitrineError, VitrineResult};
use crate::query::parse_sort;
use crate::repository::{LogObserver, OperationObserver};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Engine-wide settings shared by every repository of a connection.
///
/// | setting | default |
/// |---|---|
/// | `max_page_limit` | 100 |
/// | `default_page_limit` | 20 |
/// | `default_sort` | `-created_at` |
/// | `related_limit` | 4 |
/// | `observer` | [LogObserver] |
///
/// Settings are changed through the connection builder, which validates every value.
#[derive(Clone)]
pub struct EngineConfig {
    max_page_limit: u64,
    default_page_limit: u64,
    default_sort: String,
    related_limit: u64,
    observer: Arc<dyn OperationObserver>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            default_sort: DEFAULT_SORT.to_string(),
            related_limit: DEFAULT_RELATED_LIMIT,
            observer: Arc::new(LogObserver),
        }
    }

    /// Hard upper bound for any page size; larger requests are clamped.
    pub fn max_page_limit(&self) -> u64 {
        self.max_page_limit
    }

    /// Page size used when the caller does not ask for one.
    pub fn default_page_limit(&self) -> u64 {
        self.default_page_limit
    }

    pub fn default_sort(&self) -> &str {
        &self.default_sort
    }

    /// Cap of "related items" queries when the caller does not pass one.
    pub fn related_limit(&self) -> u64 {
        self.related_limit
    }

    pub fn observer(&self) -> &Arc<dyn OperationObserver> {
        &self.observer
    }

    pub(crate) fn set_max_page_limit(&mut self, limit: u64) -> VitrineResult<()> {
        if limit == 0 {
            log::error!("Maximum page limit must be at least 1");
            return Err(VitrineError::new(
                "Maximum page limit must be at least 1",
                ErrorKind::InvalidOperation,
            ));
        }
        self.max_page_limit = limit;
        self.default_page_limit = self.default_page_limit.min(limit);
        Ok(())
    }

    pub(crate) fn set_default_page_limit(&mut self, limit: u64) -> VitrineResult<()> {
        if limit == 0 || limit > self.max_page_limit {
            log::error!(
                "Default page limit {} must be between 1 and {}",
                limit,
                self.max_page_limit
            );
            return Err(VitrineError::new(
                &format!(
                    "Default page limit must be between 1 and {}",
                    self.max_page_limit
                ),
                ErrorKind::InvalidOperation,
            ));
        }
        self.default_page_limit = limit;
        Ok(())
    }

    pub(crate) fn set_default_sort(&mut self, sort: &str) -> VitrineResult<()> {
        if sort.trim().is_empty() {
            return Err(VitrineError::new(
                "Default sort must name at least one field",
                ErrorKind::InvalidOperation,
            ));
        }
        // reject malformed sort strings up front
        parse_sort(sort)?;
        self.default_sort = sort.to_string();
        Ok(())
    }

    pub(crate) fn set_related_limit(&mut self, limit: u64) -> VitrineResult<()> {
        if limit == 0 {
            return Err(VitrineError::new(
                "Related limit must be at least 1",
                ErrorKind::InvalidOperation,
            ));
        }
        self.related_limit = limit;
        Ok(())
    }

    pub(crate) fn set_observer(&mut self, observer: Arc<dyn OperationObserver>) {
        self.observer = observer;
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new()
    }
}

impl Debug for EngineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("max_page_limit", &self.max_page_limit)
            .field("default_page_limit", &self.default_page_limit)
            .field("default_sort", &self.default_sort)
            .field("related_limit", &self.related_limit)
            .finish_non_exhaustive()
    }
}
