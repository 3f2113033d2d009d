#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod routes;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;

/// Problem details demo - every endpoint fails in its own way
#[derive(Parser)]
#[command(name = "problemkit-demo")]
#[command(about = "Serve endpoints that answer with RFC 7807 problem details")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Include a traceback in every problem body
    #[arg(long)]
    with_traceback: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "problemkit={default_level},problemkit_demo={default_level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // defaults -> YAML (if provided) -> env (PROBLEMKIT__*) -> CLI overrides
    let mut config = DemoConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.with_traceback);

    let addr = config.socket_addr()?;
    let app = routes::app(config.problem);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "problemkit demo listening");
    axum::serve(listener, app).await?;
    Ok(())
}
