use async_trait::async_trait;
use serde::Serialize;
use time::Date;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::models::Book;

/// Outcome of one scanner cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverdueReport {
    /// At least one title is past the threshold.
    Overdue { as_of: Date, books: Vec<Book> },
    AllClear { as_of: Date },
}

impl OverdueReport {
    pub fn from_scan(as_of: Date, books: Vec<Book>) -> Self {
        if books.is_empty() {
            OverdueReport::AllClear { as_of }
        } else {
            OverdueReport::Overdue { as_of, books }
        }
    }

    pub fn as_of(&self) -> Date {
        match self {
            OverdueReport::Overdue { as_of, .. } | OverdueReport::AllClear { as_of } => *as_of,
        }
    }

    /// Overdue titles; empty for an all-clear report.
    pub fn books(&self) -> &[Book] {
        match self {
            OverdueReport::Overdue { books, .. } => books.as_slice(),
            OverdueReport::AllClear { .. } => &[],
        }
    }

    pub fn is_all_clear(&self) -> bool {
        matches!(self, OverdueReport::AllClear { .. })
    }
}

/// Destination for scanner reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, cycle: u64, report: OverdueReport) -> anyhow::Result<()>;
}

/// Writes every report to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn emit(&self, cycle: u64, report: OverdueReport) -> anyhow::Result<()> {
        match &report {
            OverdueReport::Overdue { as_of, books } => {
                tracing::warn!(cycle, %as_of, count = books.len(), "overdue books found");
                for book in books {
                    tracing::warn!(
                        cycle,
                        isbn = book.isbn(),
                        title = book.title(),
                        author = book.author(),
                        copies_available = book.copies_available(),
                        issue_date = ?book.issue_date(),
                        "overdue book"
                    );
                }
            }
            OverdueReport::AllClear { as_of } => {
                tracing::info!(cycle, %as_of, "no overdue books at the moment");
            }
        }
        Ok(())
    }
}

/// Forwards reports to an in-process consumer over a bounded channel.
///
/// A full channel drops the report and fails the emit; the scanner never
/// waits on a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OverdueReport>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OverdueReport>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    async fn emit(&self, cycle: u64, report: OverdueReport) -> anyhow::Result<()> {
        self.tx.try_send(report).map_err(|err| match err {
            TrySendError::Full(_) => {
                anyhow::anyhow!("report channel full, dropped cycle {}", cycle)
            }
            TrySendError::Closed(_) => {
                anyhow::anyhow!("report receiver dropped before cycle {}", cycle)
            }
        })
    }
}
