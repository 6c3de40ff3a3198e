//! `bookstore` command line: run the service or inspect its configuration.

use std::path::PathBuf;

use anyhow::Context;
use bookstore_db::Database;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookstore", version, about = "Bookstore catalog service")]
struct Cli {
    /// Directory holding base.toml and the environment overlays.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to apply (local, staging, production).
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API until interrupted.
    Serve,

    /// Print the resolved settings as JSON.
    Settings,

    /// Check that the configured document store can be opened.
    Ping,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        if self.config_dir.is_none() && self.env.is_none() {
            return Settings::load().with_context(|| "failed to load bookstore settings");
        }

        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        let env = self.env.as_deref().unwrap_or("local");
        Settings::load_from(&config_dir, env)
            .with_context(|| format!("failed to load settings from {}", config_dir.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    match cli.command {
        Commands::Serve => {
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookstore serve");
            bookstore_app::run(settings).await
        }
        Commands::Settings => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Commands::Ping => {
            let database = Database::connect(&settings.database)?;
            database.ping().await?;
            println!(
                "ok: {} database '{}'",
                database.backend_kind(),
                database.name()
            );
            Ok(())
        }
    }
}
