//! Buzzer game binary.
//!
//! Runs the first-correct-answer engine behind its HTTP API, a fleet of
//! simulated participants, or both.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line arguments
//! 2. Load configuration from `buzzer-config.yaml` (defaults if absent)
//! 3. Apply command-line overrides
//! 4. Initialize structured logging (tracing)
//! 5. Run the selected mode until it finishes or is interrupted

mod console;
mod error;
mod modes;

use std::path::{Path, PathBuf};

use buzzer_core::BuzzerConfig;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// What the process should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve the API with an interactive operator console.
    Server,
    /// Send simulated users to an already running API.
    Mock,
    /// Serve the API and simulate users against it in one process.
    Full,
}

/// First-correct-answer buzzer game server and load simulator.
#[derive(Debug, Parser)]
#[command(name = "buzzer", version, long_about = None)]
struct Cli {
    /// Run mode.
    #[arg(long, value_enum, default_value_t = Mode::Server)]
    mode: Mode,

    /// API server port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Number of simulated users (overrides the config file).
    #[arg(long)]
    users: Option<u32>,

    /// Submission URL targeted in `mock` mode.
    #[arg(long, default_value = "http://localhost:8080/submit")]
    api: String,

    /// Path to the YAML configuration file.
    #[arg(long, default_value = "buzzer-config.yaml")]
    config: PathBuf,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the selected mode
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(users) = cli.users {
        config.loadgen.users = users;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        mode = ?cli.mode,
        port = config.server.port,
        queue_capacity = config.engine.queue_capacity,
        users = config.loadgen.users,
        "buzzer starting"
    );

    match cli.mode {
        Mode::Server => modes::run_server(&config).await?,
        Mode::Mock => modes::run_mock(&config, &cli.api).await?,
        Mode::Full => modes::run_full(&config).await?,
    }

    info!("buzzer shutdown complete");
    Ok(())
}

/// Load configuration from `path`, or defaults (plus environment
/// overrides) when the file does not exist.
fn load_config(path: &Path) -> Result<BuzzerConfig, AppError> {
    if path.exists() {
        Ok(BuzzerConfig::from_file(path)?)
    } else {
        Ok(BuzzerConfig::parse("")?)
    }
}
