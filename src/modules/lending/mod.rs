pub mod catalog;
pub mod clock;
pub mod error;
pub mod members;
pub mod models;
pub mod scanner;
pub mod service;
pub mod sink;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lending_kernel::{InitCtx, Module};

use crate::utils;

pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LendingError;
pub use members::MembershipRegistry;
pub use models::{Book, Isbn, Loan, Member, MemberId};
pub use scanner::{OverdueScanner, ScanSummary, ScannerHandle, ScannerState};
pub use service::LendingService;
pub use sink::{ChannelSink, OverdueReport, ReportSink, TracingSink};

/// Lending module: owns the catalog, the member registry and the overdue
/// scanner that runs while the module is started.
pub struct LendingModule {
    service: LendingService,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReportSink>,
    scanner: Mutex<Option<ScannerHandle>>,
}

impl LendingModule {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_sink(clock, Arc::new(TracingSink))
    }

    pub fn with_sink(clock: Arc<dyn Clock>, sink: Arc<dyn ReportSink>) -> Self {
        let service = LendingService::new(
            Arc::new(Catalog::new()),
            Arc::new(MembershipRegistry::new()),
            clock.clone(),
        );
        Self {
            service,
            clock,
            sink,
            scanner: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &LendingService {
        &self.service
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.service.catalog()
    }

    pub fn members(&self) -> &Arc<MembershipRegistry> {
        self.service.members()
    }

    /// State of the scanner, `None` while the module is not started.
    pub fn scanner_state(&self) -> Option<ScannerState> {
        self.scanner_slot().as_ref().map(ScannerHandle::state)
    }

    fn scanner_slot(&self) -> std::sync::MutexGuard<'_, Option<ScannerHandle>> {
        self.scanner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Module for LendingModule {
    fn name(&self) -> &'static str {
        "lending"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let prefix = utils::log_prefix(self.name());
        tracing::info!(
            module = self.name(),
            %prefix,
            environment = ?ctx.settings.environment,
            books = self.catalog().len(),
            members = self.members().len(),
            "lending module initialized"
        );
        Ok(())
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let settings = &ctx.settings.scanner;
        if !settings.enabled {
            tracing::info!(module = self.name(), "overdue scanner disabled");
            return Ok(());
        }

        let mut slot = self.scanner_slot();
        if slot.is_some() {
            anyhow::bail!("overdue scanner is already running");
        }

        let scanner = OverdueScanner::new(self.catalog().clone(), self.clock.clone(), settings);
        *slot = Some(scanner.start(self.sink.clone()));
        tracing::info!(module = self.name(), "lending module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let handle = self.scanner_slot().take();
        if let Some(handle) = handle {
            let summary = handle.stop().await?;
            tracing::info!(
                module = self.name(),
                cycles = summary.cycles,
                sink_failures = summary.sink_failures,
                "lending module stopped"
            );
        }
        Ok(())
    }
}

/// Create the lending module backed by the given clock.
pub fn create_module(clock: Arc<dyn Clock>) -> Arc<LendingModule> {
    Arc::new(LendingModule::new(clock))
}
