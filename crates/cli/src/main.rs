//! wgprov CLI - Main Entry Point
//!
//! Issues WireGuard client configs: allocates an address, generates keys
//! and writes client, RouterOS and server-side peer configs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wgprov_cli::commands::{self, issue, setup, Context};
use wgprov_cli::config::{default_settings_path, Settings};
use wgprov_cli::output::{self, print_error};

/// wgprov - WireGuard client provisioning
#[derive(Parser)]
#[command(name = "wgprov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the registry, server profile and generated configs
    #[arg(long, env = "WGPROV_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to <data-dir>/wgprov.toml)
    #[arg(long, env = "WGPROV_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to the `wg` binary used for key generation
    #[arg(long, env = "WGPROV_WG_BINARY", global = true)]
    wg_binary: Option<PathBuf>,

    /// Timeout in seconds for each key generation call
    #[arg(long, env = "WGPROV_KEYGEN_TIMEOUT", global = true)]
    keygen_timeout: Option<u64>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a new client config
    Issue(issue::IssueArgs),

    /// Create or replace the server profile
    Setup(setup::SetupArgs),

    /// Show the server profile (private key redacted)
    Profile,

    /// List registered clients
    List,

    /// Show the address the next client would receive
    Next,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; stderr keeps stdout clean for --format json
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format;
    if let Err(e) = run(cli).await {
        if format == output::OutputFormat::Json {
            let kind = e
                .downcast_ref::<wgprov_common::Error>()
                .map_or("error", wgprov_common::Error::kind);
            output::print_json(&serde_json::json!({
                "error": kind,
                "message": format!("{:#}", e),
            }));
        }
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli.data_dir.unwrap_or_else(wgprov_common::default_data_dir);
    let settings_path = cli
        .config
        .unwrap_or_else(|| default_settings_path(&data_dir));

    let mut settings = Settings::load(&settings_path)?;
    if let Some(wg_binary) = cli.wg_binary {
        settings.wg_binary = wg_binary;
    }
    if let Some(timeout) = cli.keygen_timeout {
        settings.keygen_timeout_secs = timeout;
    }

    let ctx = Context {
        data_dir,
        settings,
        settings_path,
        format: cli.format,
    };

    match cli.command {
        Commands::Issue(args) => issue::execute(args, &ctx).await?,
        Commands::Setup(args) => setup::execute(args, &ctx)?,
        Commands::Profile => setup::show(&ctx)?,
        Commands::List => commands::list::execute(&ctx)?,
        Commands::Next => commands::list::next(&ctx)?,
    }

    Ok(())
}
