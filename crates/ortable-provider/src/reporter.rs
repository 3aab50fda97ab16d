use std::time::Duration;

use ortable::alarm::AlarmStatus;
use ortable::report::Report;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tokio_util::sync::CancellationToken;

use tracing::info;

use crate::table::TableHandle;

/// Default period between two metric reports.
pub const DEFAULT_REPORT_PERIOD: Duration = Duration::from_millis(500);

// Shortest accepted period.
const MIN_REPORT_PERIOD: Duration = Duration::from_millis(1);

/// A periodic reporter of the table state.
///
/// On every tick it publishes a [`Report::Metrics`] containing a table
/// snapshot. A [`Report::Alert`] is published only when at least one alarm
/// changed its presence since the previous tick.
#[derive(Debug)]
pub struct Reporter {
    table: TableHandle,
    period: Duration,
    cancellation_token: CancellationToken,
    previous_alarms: AlarmStatus,
}

impl Reporter {
    /// Creates a [`Reporter`] for the given table.
    ///
    /// The reporter stops when the table is closed.
    #[must_use]
    pub fn new(table: TableHandle) -> Self {
        let cancellation_token = table.cancellation_token().child_token();
        Self {
            table,
            period: DEFAULT_REPORT_PERIOD,
            cancellation_token,
            previous_alarms: AlarmStatus::default(),
        }
    }

    /// Sets the period between two reports.
    ///
    /// Periods shorter than one millisecond are raised to one millisecond.
    #[must_use]
    pub const fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Returns the token which stops the reporter when cancelled.
    #[must_use]
    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Runs the reporter in a background task.
    #[must_use]
    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(self.report_loop())
    }

    async fn report_loop(mut self) {
        info!("Reporting table state every {:?}", self.period);

        let mut interval = tokio::time::interval(self.period.max(MIN_REPORT_PERIOD));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancellation_token.cancelled() => break,
                _ = interval.tick() => self.report().await,
            }
        }

        info!("Reporter stopped");
    }

    async fn report(&mut self) {
        let snapshot = self.table.snapshot().await;

        self.table.publish(Report::Metrics(snapshot));

        let changes = snapshot.alarms.changes_from(&self.previous_alarms);
        if !changes.is_empty() {
            self.table.publish(Report::Alert(changes));
        }

        self.previous_alarms = snapshot.alarms;
    }
}
