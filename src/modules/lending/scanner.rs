//! Background task that periodically reports overdue titles.
//!
//! The task moves `Idle -> Scanning -> Sleeping -> Scanning -> ...` and ends in
//! `Stopped`. A scan is a short catalog read followed by one sink call and is
//! never interrupted; a stop request that arrives meanwhile is picked up as
//! soon as the report has been emitted. Sleeping is cut short by a stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lending_kernel::settings::ScannerSettings;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::catalog::Catalog;
use super::clock::Clock;
use super::sink::{OverdueReport, ReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Scanning,
    Sleeping,
    Stopped,
}

/// Counters returned once the scanner has stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub cycles: u64,
    pub overdue_reports: u64,
    pub all_clear_reports: u64,
    pub sink_failures: u64,
}

#[derive(Debug, Clone)]
pub struct OverdueScanner {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    threshold_days: i64,
}

impl OverdueScanner {
    pub fn new(catalog: Arc<Catalog>, clock: Arc<dyn Clock>, settings: &ScannerSettings) -> Self {
        Self {
            catalog,
            clock,
            interval: settings.interval(),
            threshold_days: settings.overdue_threshold_days,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_threshold_days(mut self, threshold_days: i64) -> Self {
        self.threshold_days = threshold_days;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One snapshot read of the catalog.
    pub fn scan(&self) -> OverdueReport {
        let as_of = self.clock.today();
        OverdueReport::from_scan(as_of, self.catalog.find_overdue(as_of, self.threshold_days))
    }

    /// Spawn the scanner on the current tokio runtime.
    pub fn start(self, sink: Arc<dyn ReportSink>) -> ScannerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ScannerState::Idle);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            threshold_days = self.threshold_days,
            "overdue scanner starting"
        );
        let join = tokio::spawn(self.run(sink, stop_rx, state_tx));

        ScannerHandle {
            stop_tx,
            state_rx,
            join,
        }
    }

    async fn run(
        self,
        sink: Arc<dyn ReportSink>,
        mut stop_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<ScannerState>,
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();

        while !*stop_rx.borrow() {
            state_tx.send_replace(ScannerState::Scanning);
            let cycle = summary.cycles + 1;
            let report = self.scan();
            if report.is_all_clear() {
                summary.all_clear_reports += 1;
            } else {
                summary.overdue_reports += 1;
            }

            if let Err(err) = sink.emit(cycle, report).await {
                summary.sink_failures += 1;
                tracing::warn!(cycle, error = %err, "overdue report could not be delivered");
            }
            summary.cycles = cycle;

            if *stop_rx.borrow() {
                break;
            }

            state_tx.send_replace(ScannerState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!(cycle, "scanner handle dropped during sleep; exiting");
                        break;
                    }
                    tracing::debug!(cycle, "scanner sleep interrupted");
                }
            }
        }

        state_tx.send_replace(ScannerState::Stopped);
        tracing::info!(
            cycles = summary.cycles,
            overdue_reports = summary.overdue_reports,
            all_clear_reports = summary.all_clear_reports,
            "overdue scanner stopped"
        );
        summary
    }
}

/// Control side of a running scanner.
#[derive(Debug)]
pub struct ScannerHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<ScannerState>,
    join: JoinHandle<ScanSummary>,
}

impl ScannerHandle {
    pub fn state(&self) -> ScannerState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state_rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Ask the scanner to stop without waiting for it.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stop the scanner and wait for its last cycle to finish.
    pub async fn stop(self) -> anyhow::Result<ScanSummary> {
        self.request_stop();
        self.join
            .await
            .with_context(|| "overdue scanner task did not finish cleanly")
    }
}
