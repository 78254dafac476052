pub mod lending;

use std::sync::Arc;

use lending_kernel::ModuleRegistry;

/// Register all application modules with the registry.
///
/// The lending module is handed back so the bootstrap can seed and drive it.
pub fn register_all(
    registry: &mut ModuleRegistry,
    clock: Arc<dyn lending::Clock>,
) -> Arc<lending::LendingModule> {
    let lending = lending::create_module(clock);
    registry.register(lending.clone());
    lending
}
