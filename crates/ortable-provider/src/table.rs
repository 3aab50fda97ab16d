use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ortable::command::Command;
use ortable::controller::{AxisController, TableSnapshot};
use ortable::report::Report;
use ortable::response::{CommandResponse, InvocationInfo, InvocationState};

use tokio::sync::{Mutex, broadcast};

use tokio_util::sync::CancellationToken;

use tracing::{debug, info, warn};

// Number of reports kept for observers which fall behind.
const REPORTS_CAPACITY: usize = 64;

/// A shared handle to the table of a provider.
///
/// All clones refer to the same [`AxisController`]. Commands and snapshot
/// reads run under one lock, so a reader never observes axis values without
/// their matching alarm flags.
#[derive(Debug, Clone)]
pub struct TableHandle {
    controller: Arc<Mutex<AxisController>>,
    transaction_id: Arc<AtomicU64>,
    reports: broadcast::Sender<Report>,
    cancellation_token: CancellationToken,
}

impl Default for TableHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TableHandle {
    /// Creates a [`TableHandle`] with the table in its initial position.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::with_controller(AxisController::new())
    }

    /// Creates a [`TableHandle`] from an existing [`AxisController`].
    #[must_use]
    pub fn with_controller(controller: AxisController) -> Self {
        let (reports, _) = broadcast::channel(REPORTS_CAPACITY);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            transaction_id: Arc::new(AtomicU64::new(0)),
            reports,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Executes a [`Command`] on the table.
    ///
    /// The invocation is also published to all report observers. Invocation
    /// reports are published in transaction id order.
    pub async fn execute(&self, command: Command) -> CommandResponse {
        let mut controller = self.controller.lock().await;

        let invocation = InvocationInfo {
            transaction_id: self.next_transaction_id(),
            operation: command.operation(),
            invocation_state: InvocationState::Finished,
            error: None,
        };
        let snapshot = controller.execute(command);
        self.publish(Report::OperationInvoked(invocation.clone()));
        drop(controller);

        info!(
            "Transaction {}: `{command}` finished",
            invocation.transaction_id
        );

        CommandResponse {
            invocation,
            snapshot,
        }
    }

    /// Records an invocation rejected before reaching the table.
    ///
    /// The failed invocation is published to all report observers.
    pub async fn reject(
        &self,
        operation: impl Into<String>,
        cause: impl Into<String>,
    ) -> InvocationInfo {
        let controller = self.controller.lock().await;

        let invocation = InvocationInfo {
            transaction_id: self.next_transaction_id(),
            operation: operation.into(),
            invocation_state: InvocationState::Failed,
            error: Some(cause.into()),
        };
        self.publish(Report::OperationInvoked(invocation.clone()));
        drop(controller);

        warn!(
            "Transaction {}: `{}` failed",
            invocation.transaction_id, invocation.operation
        );

        invocation
    }

    /// Returns a consistent [`TableSnapshot`] of the table.
    pub async fn snapshot(&self) -> TableSnapshot {
        self.controller.lock().await.snapshot()
    }

    /// Subscribes to the reports published for this table.
    #[must_use]
    #[inline]
    pub fn subscribe(&self) -> broadcast::Receiver<Report> {
        self.reports.subscribe()
    }

    /// Returns the token cancelled when the table is closed.
    #[must_use]
    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Closes the table, ending all report streams and reporters.
    #[inline]
    pub fn close(&self) {
        self.cancellation_token.cancel();
    }

    pub(crate) fn publish(&self, report: Report) {
        if self.reports.send(report).is_err() {
            debug!("No report observers");
        }
    }

    fn next_transaction_id(&self) -> u64 {
        self.transaction_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use ortable::alarm::AlarmStatus;
    use ortable::axis::Axis;
    use ortable::command::Command;
    use ortable::report::Report;
    use ortable::response::InvocationState;
    use ortable::table::PresetPosition;

    use super::TableHandle;

    #[tokio::test]
    async fn execute_publishes_invocations() {
        let table = TableHandle::new();
        let mut reports = table.subscribe();

        let first = table.execute(Command::IncreaseAxis(Axis::Height)).await;
        let second = table.execute(Command::ApplyPreset).await;

        assert_eq!(first.snapshot.state.height, 81.);
        assert_eq!(first.invocation.operation, "height/increase");
        assert_eq!(first.invocation.invocation_state, InvocationState::Finished);
        assert!(second.invocation.transaction_id > first.invocation.transaction_id);

        assert_eq!(
            reports.recv().await.unwrap(),
            Report::OperationInvoked(first.invocation)
        );
        assert_eq!(
            reports.recv().await.unwrap(),
            Report::OperationInvoked(second.invocation)
        );
    }

    #[tokio::test]
    async fn reject_publishes_failure() {
        let table = TableHandle::new();
        let mut reports = table.subscribe();

        let invocation = table
            .reject("preset", "unknown preset position `Lounge`")
            .await;

        assert_eq!(invocation.invocation_state, InvocationState::Failed);
        assert_eq!(
            reports.recv().await.unwrap(),
            Report::OperationInvoked(invocation)
        );
        // The table has not moved.
        assert_eq!(table.snapshot().await.state, PresetPosition::NullLevel.state());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_invocations_are_reported_in_order() {
        let table = TableHandle::new();
        let mut reports = table.subscribe();

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let table = table.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        if i % 2 == 0 {
                            table.execute(Command::IncreaseAxis(Axis::Height)).await;
                        } else {
                            table.reject("preset", "unknown preset position `Lounge`").await;
                        }
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.await.unwrap();
        }

        let mut last = 0;
        for _ in 0..40 {
            let Report::OperationInvoked(invocation) = reports.recv().await.unwrap() else {
                panic!("expected an invocation report");
            };
            assert_eq!(invocation.transaction_id, last + 1);
            last = invocation.transaction_id;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn snapshots_are_never_torn() {
        let table = TableHandle::new();

        let writer = {
            let table = table.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    let position = if i % 2 == 0 {
                        PresetPosition::BeachChair
                    } else {
                        PresetPosition::NullLevel
                    };
                    table.execute(Command::SetPreset(position)).await;
                    table.execute(Command::ApplyPreset).await;
                    table.execute(Command::DecreaseAxis(Axis::Backplate)).await;
                }
            })
        };

        for _ in 0..500 {
            let snapshot = table.snapshot().await;
            assert_eq!(snapshot.alarms, AlarmStatus::evaluate(&snapshot.state));
            assert_eq!(snapshot.state.height, 80.);
            assert_eq!(snapshot.state.trend, 0.);
            assert_eq!(snapshot.state.tilt, 0.);
        }

        writer.await.unwrap();
    }

    #[test]
    fn close_cancels_token() {
        let table = TableHandle::new();
        let token = table.cancellation_token();

        assert!(!token.is_cancelled());
        table.clone().close();
        assert!(token.is_cancelled());
    }
}
