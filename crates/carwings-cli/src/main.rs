//! leaf-info - Command-line tool for Nissan Carwings telemetry
//!
//! Logs in, reads the battery and climate-control state of the account's
//! vehicle and can ask the car to report fresh data.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use carwings_client::Session;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AccountArgs, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "leaf-info")]
#[command(author, version, about = "Nissan Carwings battery and climate status")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CARWINGS_CONFIG")]
    config: Option<PathBuf>,

    /// Carwings account user name
    #[arg(short, long, env = "CARWINGS_USERNAME")]
    username: Option<String>,

    /// Carwings account password
    #[arg(short, long, env = "CARWINGS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Account region (US, EU, CA, AU, JP or a vendor code such as NNA)
    #[arg(short, long, env = "CARWINGS_REGION")]
    region: Option<String>,

    /// Gateway base URL override
    #[arg(long, env = "CARWINGS_BASE_URL")]
    base_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest battery and climate-control status known to the gateway
    Status,

    /// Ask the vehicle to report, wait for it, then show the fresh status
    Refresh(PollArgs),

    /// Status, refresh and status again
    Info(PollArgs),
}

#[derive(Args)]
struct PollArgs {
    /// Seconds to wait before each completion check
    #[arg(long)]
    interval: Option<u64>,

    /// Number of completion checks before giving up
    #[arg(long)]
    attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable config file: {:#}", e);
            Config::default()
        })
    };

    // Merge CLI args with config
    let args = AccountArgs {
        username: cli.username.as_deref(),
        password: cli.password.as_deref(),
        region: cli.region.as_deref(),
        base_url: cli.base_url.as_deref(),
    };
    let merged = config.merge_with_args(&args, cli.no_color)?;
    debug!("Using {:?}", merged.credentials);

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    ctx.info("Logging in...");
    let session = Session::open(&merged.credentials)
        .await
        .context("Failed to log in")?;

    // Log out on every path, including command failures
    let result = execute(&session, &cli.command, &config, &ctx).await;
    session.logout();
    ctx.flush();
    result
}

async fn execute(
    session: &Session,
    command: &Commands,
    config: &Config,
    ctx: &OutputContext,
) -> Result<()> {
    let vehicle = session
        .get_vehicle()
        .context("Account has no usable vehicle")?;

    match command {
        Commands::Status => commands::status(&vehicle, ctx).await,

        Commands::Refresh(args) => {
            let policy = config.refresh.policy(args.interval, args.attempts);
            commands::refresh(&vehicle, policy, ctx).await
        }

        Commands::Info(args) => {
            let policy = config.refresh.policy(args.interval, args.attempts);
            commands::info(&vehicle, policy, ctx).await
        }
    }
}
