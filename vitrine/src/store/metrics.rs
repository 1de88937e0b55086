//! Document store call metrics.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// The operations a document store serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOperation {
    Find,
    Count,
    Insert,
    FindOneAndUpdate,
    UpdateMany,
    FindOneAndDelete,
    DeleteMany,
    BulkWrite,
    CountBy,
}

impl StoreOperation {
    pub const ALL: [StoreOperation; 9] = [
        StoreOperation::Find,
        StoreOperation::Count,
        StoreOperation::Insert,
        StoreOperation::FindOneAndUpdate,
        StoreOperation::UpdateMany,
        StoreOperation::FindOneAndDelete,
        StoreOperation::DeleteMany,
        StoreOperation::BulkWrite,
        StoreOperation::CountBy,
    ];

    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            StoreOperation::Find | StoreOperation::Count | StoreOperation::CountBy
        )
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for StoreOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOperation::Find => "find",
            StoreOperation::Count => "count",
            StoreOperation::Insert => "insert",
            StoreOperation::FindOneAndUpdate => "find_one_and_update",
            StoreOperation::UpdateMany => "update_many",
            StoreOperation::FindOneAndDelete => "find_one_and_delete",
            StoreOperation::DeleteMany => "delete_many",
            StoreOperation::BulkWrite => "bulk_write",
            StoreOperation::CountBy => "count_by",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Default)]
struct OperationCounter {
    count: AtomicU64,
    latency_us: AtomicU64,
    errors: AtomicU64,
}

/// Per-operation call counts and latencies of a document store.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    counters: [OperationCounter; 9],
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call of `operation`.
    pub fn record(&self, operation: StoreOperation, duration: Duration, error: bool) {
        let counter = &self.counters[operation.index()];
        counter.count.fetch_add(1, Ordering::Relaxed);
        counter
            .latency_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if error {
            counter.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let operations = StoreOperation::ALL
            .iter()
            .map(|op| {
                let counter = &self.counters[op.index()];
                let count = counter.count.load(Ordering::Relaxed);
                let latency = counter.latency_us.load(Ordering::Relaxed);
                let stats = OperationStats {
                    count,
                    avg_latency_us: if count > 0 { latency / count } else { 0 },
                    errors: counter.errors.load(Ordering::Relaxed),
                };
                (*op, stats)
            })
            .collect();
        MetricsSnapshot { operations }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.count.store(0, Ordering::Relaxed);
            counter.latency_us.store(0, Ordering::Relaxed);
            counter.errors.store(0, Ordering::Relaxed);
        }
    }
}

/// Counters of a single operation at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub count: u64,
    pub avg_latency_us: u64,
    pub errors: u64,
}

/// Point-in-time copy of [StoreMetrics].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    operations: BTreeMap<StoreOperation, OperationStats>,
}

impl MetricsSnapshot {
    pub fn stats(&self, operation: StoreOperation) -> OperationStats {
        self.operations.get(&operation).copied().unwrap_or_default()
    }

    /// Number of calls of `operation`.
    pub fn calls(&self, operation: StoreOperation) -> u64 {
        self.stats(operation).count
    }

    /// Number of write calls of any kind.
    pub fn write_calls(&self) -> u64 {
        self.operations
            .iter()
            .filter(|(op, _)| op.is_write())
            .map(|(_, stats)| stats.count)
            .sum()
    }

    pub fn total_calls(&self) -> u64 {
        self.operations.values().map(|stats| stats.count).sum()
    }

    /// Calls made between `earlier` and this snapshot, per operation.
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        let operations = self
            .operations
            .iter()
            .map(|(op, stats)| {
                let before = earlier.stats(*op);
                let delta = OperationStats {
                    count: stats.count.saturating_sub(before.count),
                    avg_latency_us: stats.avg_latency_us,
                    errors: stats.errors.saturating_sub(before.errors),
                };
                (*op, delta)
            })
            .collect();
        MetricsSnapshot { operations }
    }
}
