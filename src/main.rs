// =============================================================================
// COFFEE INVENTORY - Main Entry Point
// =============================================================================
// Command-line front end for the coffee catalog:
//
//   coffee-inventory              interactive menu
//   coffee-inventory <command>    one-shot command (add, list, sync, ...)
//   coffee-inventory auto         watch the catalog and push on every change
//
// Console output goes to stdout; tracing logs go to stderr.
// =============================================================================

mod cli;
mod menu;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coffee_inventory::config::{Config, LogFormat};

use crate::cli::{App, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let cli = Cli::parse();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG wins; otherwise stay quiet for interactive use and report
    // activity in auto mode.
    let default_filter = match cli.command {
        Some(Commands::Auto) => "info,coffee_inventory=debug",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    // -------------------------------------------------------------------------
    // STEP 3: Resolve paths and dispatch
    // -------------------------------------------------------------------------
    let config = config.with_paths(cli.inventory_path.clone(), cli.orders_path.clone());
    let app = App::new(config, cli.yes)?;

    match cli.command {
        None | Some(Commands::Menu) => menu::run(&app).await?,
        Some(Commands::Auto) => app.auto().await?,
        Some(Commands::Add(args)) => app.add(args.into_new_coffee()).await?,
        Some(Commands::Update { id, stock }) => app.update_stock(&id, stock).await?,
        Some(Commands::Toggle { id }) => app.toggle(&id).await?,
        Some(Commands::List) => app.list().await?,
        Some(Commands::Order { id, quantity }) => app.order(&id, quantity).await?,
        Some(Commands::Report { days }) => app.report(days).await?,
        Some(Commands::Sync) => app.sync().await?,
        Some(Commands::Pull) => app.pull().await?,
    }

    Ok(())
}
