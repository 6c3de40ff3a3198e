pub mod books;

use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    database: &Database,
    settings: &Settings,
) -> anyhow::Result<()> {
    registry.register_custom(books::create_module(database, settings)?);
    Ok(())
}
