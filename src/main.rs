use std::sync::Arc;

use anyhow::Context;
use lending_app::modules;
use lending_app::{Book, LendingModule, Member, SystemClock};
use lending_kernel::settings::Settings;
use lending_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load lending settings")?;
    lending_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        scan_interval_ms = settings.scanner.interval_ms,
        "lending-app bootstrap starting"
    );

    let mut registry = ModuleRegistry::new();
    let lending = modules::register_all(&mut registry, Arc::new(SystemClock));
    seed(&lending)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;

    let service = lending.service();
    if !service.issue(1, 101) {
        tracing::warn!(isbn = 1, member_id = 101, "demo issue was refused");
    }

    registry.start_all(&ctx).await?;
    tracing::info!("lending-app bootstrap complete");

    tokio::select! {
        _ = tokio::time::sleep(settings.demo.run_for()) => {}
        _ = shutdown_signal() => {
            tracing::info!("shutdown requested");
        }
    }

    if !service.return_book(1, 101) {
        tracing::warn!(isbn = 1, member_id = 101, "demo return was refused");
    }
    for book in lending.catalog().list() {
        tracing::info!(
            isbn = book.isbn(),
            title = book.title(),
            copies_available = book.copies_available(),
            "catalog entry"
        );
    }

    registry.stop_all().await
}

fn seed(lending: &LendingModule) -> anyhow::Result<()> {
    let catalog = lending.catalog();
    catalog.add(Book::new(1, "Atomic Habits", "James Clear", "Self-help", 5))?;
    catalog.add(Book::new(2, "The Alchemist", "Paulo Coelho", "Fiction", 3))?;

    let members = lending.members();
    members.add(Member::new(101, "Alice"))?;
    members.add(Member::new(102, "Bob"))?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "unable to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
