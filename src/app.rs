use std::sync::Arc;

use anyhow::Context;
use bookstore_db::{Database, DatabaseModule};
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Registry with the document store as core module and the catalog on top.
pub fn build_registry(database: &Database, settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DatabaseModule::new(database.clone())));
    modules::register_all(&mut registry, database, settings)?;
    Ok(registry)
}

/// Run the service until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let database = Database::connect(&settings.database).with_context(|| {
        format!(
            "failed to open document store '{}'",
            settings.database.connection_string
        )
    })?;
    let registry = build_registry(&database, &settings)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served =
        bookstore_http::start_server(&registry, &settings, bookstore_http::shutdown_signal()).await;

    registry.stop_all().await?;
    served
}
