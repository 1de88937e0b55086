use crate::errors::{ErrorKind, VitrineError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// How a repository operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Success,
    /// Rejected because of caller input (validation, cast, duplicate key, ...).
    ClientError(ErrorKind),
    /// Failed in the store or in record mapping.
    Failure(ErrorKind),
}

impl OperationOutcome {
    pub(crate) fn from_result<T>(result: &Result<T, VitrineError>) -> Self {
        match result {
            Ok(_) => OperationOutcome::Success,
            Err(e) if e.is_client_error() => OperationOutcome::ClientError(e.kind().clone()),
            Err(e) => OperationOutcome::Failure(e.kind().clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success)
    }
}

impl Display for OperationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationOutcome::Success => write!(f, "ok"),
            OperationOutcome::ClientError(kind) => write!(f, "rejected: {}", kind),
            OperationOutcome::Failure(kind) => write!(f, "failed: {}", kind),
        }
    }
}

/// One timed repository call.
#[derive(Debug, Clone)]
pub struct OperationEvent<'a> {
    pub operation: &'a str,
    pub entity: &'a str,
    pub duration: Duration,
    pub outcome: OperationOutcome,
}

/// Receives an [OperationEvent] for every repository call, successful or not.
///
/// Observers are called inline on the calling task and must not block.
pub trait OperationObserver: Send + Sync {
    fn observe(&self, event: &OperationEvent<'_>);
}

/// Default observer: logs every operation at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl OperationObserver for LogObserver {
    fn observe(&self, event: &OperationEvent<'_>) {
        log::debug!(
            "{}.{} took {:?} ({})",
            event.entity,
            event.operation,
            event.duration,
            event.outcome
        );
    }
}

/// Aggregated counters of one `(entity, operation)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationSummary {
    pub calls: u64,
    pub client_errors: u64,
    pub failures: u64,
    pub total_latency_us: u64,
}

impl OperationSummary {
    pub fn avg_latency_us(&self) -> u64 {
        if self.calls > 0 {
            self.total_latency_us / self.calls
        } else {
            0
        }
    }
}

/// Observer aggregating call counts and latencies per `(entity, operation)`.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    summaries: Mutex<BTreeMap<(String, String), OperationSummary>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, entity: &str, operation: &str) -> OperationSummary {
        self.summaries
            .lock()
            .get(&(entity.to_string(), operation.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<(String, String), OperationSummary> {
        self.summaries.lock().clone()
    }

    pub fn reset(&self) {
        self.summaries.lock().clear();
    }
}

impl OperationObserver for MetricsObserver {
    fn observe(&self, event: &OperationEvent<'_>) {
        let mut summaries = self.summaries.lock();
        let summary = summaries
            .entry((event.entity.to_string(), event.operation.to_string()))
            .or_default();
        summary.calls += 1;
        summary.total_latency_us += event.duration.as_micros() as u64;
        match event.outcome {
            OperationOutcome::Success => {}
            OperationOutcome::ClientError(_) => summary.client_errors += 1,
            OperationOutcome::Failure(_) => summary.failures += 1,
        }
    }
}

/// An owned copy of an [OperationEvent].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOperation {
    pub operation: String,
    pub entity: String,
    pub outcome: OperationOutcome,
}

/// Observer keeping every event in order. Handy in tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedOperation>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedOperation> {
        self.events.lock().clone()
    }

    /// Recorded events of one operation name.
    pub fn events_of(&self, operation: &str) -> Vec<RecordedOperation> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl OperationObserver for RecordingObserver {
    fn observe(&self, event: &OperationEvent<'_>) {
        self.events.lock().push(RecordedOperation {
            operation: event.operation.to_string(),
            entity: event.entity.to_string(),
            outcome: event.outcome.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(outcome: OperationOutcome) -> OperationEvent<'static> {
        OperationEvent {
            operation: "create",
            entity: "Category",
            duration: Duration::from_micros(40),
            outcome,
        }
    }

    #[test]
    fn outcome_from_result() {
        let ok: Result<(), VitrineError> = Ok(());
        assert!(OperationOutcome::from_result(&ok).is_success());

        let client: Result<(), VitrineError> =
            Err(VitrineError::new("bad", ErrorKind::ValidationError));
        assert_eq!(
            OperationOutcome::from_result(&client),
            OperationOutcome::ClientError(ErrorKind::ValidationError)
        );

        let infra: Result<(), VitrineError> = Err(VitrineError::new("down", ErrorKind::Timeout));
        assert_eq!(
            OperationOutcome::from_result(&infra),
            OperationOutcome::Failure(ErrorKind::Timeout)
        );
    }

    #[test]
    fn metrics_observer_aggregates() {
        let observer = MetricsObserver::new();
        observer.observe(&event(OperationOutcome::Success));
        observer.observe(&event(OperationOutcome::Failure(ErrorKind::StoreError)));
        observer.observe(&event(OperationOutcome::ClientError(ErrorKind::DuplicateKey)));

        let summary = observer.summary("Category", "create");
        assert_eq!(summary.calls, 3);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.client_errors, 1);
        assert_eq!(summary.avg_latency_us(), 40);
        assert_eq!(observer.summary("Category", "delete_one").calls, 0);
    }

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.observe(&event(OperationOutcome::Success));
        observer.observe(&OperationEvent {
            operation: "count",
            ..event(OperationOutcome::Success)
        });
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].operation, "count");
        assert_eq!(observer.events_of("create").len(), 1);
    }
}
