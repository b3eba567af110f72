//! simspawn - place robot models in a running Gazebo simulator
//!
//! ## Usage
//!
//! ```bash
//! # Spawn a drone 1m above the world origin
//! simspawn spawn --name test_drone --description drone_model.urdf --position 0 0 1
//!
//! # Remove it again
//! simspawn delete --name test_drone
//!
//! # Spawn, keep it around until Ctrl+C (or --hold-secs), then delete it
//! simspawn run --description drone_model.urdf
//!
//! # Same, without a simulator
//! simspawn --dry-run run --description drone_model.urdf --hold-secs 1
//! ```
//!
//! The bridge endpoint comes from `--bridge-url`, `SIMSPAWN_BRIDGE_URL`, or a
//! JSON file given with `--config`.

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use simspawn::{
    BridgeConfig, BridgeSession, DescriptionFormat, InMemorySimulator, ModelDescription,
    ModelLifecycleClient, ModelService, Position, SimError, load_description,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// simspawn: spawn and delete robot models in Gazebo
#[derive(Parser)]
#[command(name = "simspawn")]
#[command(about = "Spawn and delete robot models in a running Gazebo simulator", long_about = None)]
struct Cli {
    /// rosbridge WebSocket URL (default: ws://localhost:9090)
    #[arg(long, global = true, env = "SIMSPAWN_BRIDGE_URL")]
    bridge_url: Option<String>,

    /// Node name this client registers under (default: drone_flight_simulator)
    #[arg(long, global = true)]
    node_name: Option<String>,

    /// Reference frame for spawn poses (default: world)
    #[arg(long, global = true)]
    frame: Option<String>,

    /// Per-call timeout in seconds (default: 30)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// JSON bridge configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-memory simulator instead of connecting to rosbridge
    #[arg(long, global = true)]
    dry_run: bool,

    /// What to do when a spawn or delete fails
    #[arg(long, global = true, value_enum, default_value_t = OnError::Abort)]
    on_error: OnError,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnError {
    /// Stop and exit non-zero
    Abort,
    /// Log the failure and carry on
    Continue,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a model
    Spawn {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Delete a model by name
    Delete {
        /// Model name
        #[arg(long, default_value = "test_drone")]
        name: String,
    },

    /// Spawn a model, hold, then delete it
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// Seconds to keep the model alive (default: until Ctrl+C)
        #[arg(long)]
        hold_secs: Option<u64>,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Model name (unique in the simulator)
    #[arg(long, default_value = "test_drone")]
    name: String,

    /// URDF or SDF file describing the robot
    #[arg(long)]
    description: PathBuf,

    /// Spawn position in metres
    #[arg(
        long,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true,
        default_values_t = [0.0, 0.0, 1.0]
    )]
    position: Vec<f64>,

    /// Description format (default: detected from the root element)
    #[arg(long)]
    format: Option<DescriptionFormat>,
}

/// A command with its inputs loaded and validated
enum Plan {
    Spawn {
        name: String,
        description: ModelDescription,
        position: Position,
    },
    Delete {
        name: String,
    },
    Run {
        name: String,
        description: ModelDescription,
        position: Position,
        hold: Option<Duration>,
    },
}

impl Plan {
    /// Read description files and check coordinates before anything touches the simulator
    fn prepare(command: Commands) -> anyhow::Result<Self> {
        Ok(match command {
            Commands::Spawn { model } => {
                let (description, position) = model.load()?;
                Self::Spawn {
                    name: model.name,
                    description,
                    position,
                }
            }
            Commands::Delete { name } => Self::Delete { name },
            Commands::Run { model, hold_secs } => {
                let (description, position) = model.load()?;
                Self::Run {
                    name: model.name,
                    description,
                    position,
                    hold: hold_secs.map(Duration::from_secs),
                }
            }
        })
    }
}

impl ModelArgs {
    fn load(&self) -> anyhow::Result<(ModelDescription, Position)> {
        let position = Position::try_from(self.position.as_slice())?;
        let description = load_description(&self.description, self.format)?;
        Ok((description, position))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let config = build_config(&cli)?;
    let on_error = cli.on_error;
    let plan = Plan::prepare(cli.command)?;

    if cli.dry_run {
        info!("🧪 Dry run: using in-memory simulator");
        let client = ModelLifecycleClient::new(InMemorySimulator::new())
            .with_reference_frame(config.reference_frame.clone());
        return execute(&client, plan, on_error).await;
    }

    let url = config.url.clone();
    let session = BridgeSession::connect(config.clone())
        .await
        .with_context(|| format!("failed to attach to rosbridge at {}", url))?;

    let client = ModelLifecycleClient::new(session).with_reference_frame(config.reference_frame);
    let result = execute(&client, plan, on_error).await;

    if let Err(e) = client.into_service().close().await {
        warn!("⚠️  Failed to detach from rosbridge cleanly: {}", e);
    }

    result
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("invalid log file path: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simspawn=info,info".into()),
        )
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Config file first, then flags and environment on top
fn build_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    if let Some(url) = &cli.bridge_url {
        config.url = url.clone();
    }
    if let Some(name) = &cli.node_name {
        config = config.with_node_name(name.clone());
    }
    if let Some(frame) = &cli.frame {
        config = config.with_reference_frame(frame.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_call_timeout(Duration::from_secs(secs));
    }

    config.validate()?;
    Ok(config)
}

/// Apply the failure policy to one call's outcome
fn settle<T>(
    on_error: OnError,
    what: &str,
    result: Result<T, SimError>,
) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if on_error == OnError::Abort => {
            Err(anyhow::Error::new(e).context(format!("{} failed", what)))
        }
        Err(e) => {
            warn!("⚠️  {} failed, continuing: {}", what, e);
            Ok(None)
        }
    }
}

async fn execute<S: ModelService>(
    client: &ModelLifecycleClient<S>,
    plan: Plan,
    on_error: OnError,
) -> anyhow::Result<()> {
    match plan {
        Plan::Spawn {
            name,
            description,
            position,
        } => {
            let spawned = client.spawn(&name, &description, position).await;
            if let Some(model) = settle(on_error, "spawn", spawned)? {
                info!("✅ {} is live: {}", model.name, model.status_message);
            }
        }
        Plan::Delete { name } => {
            if settle(on_error, "delete", client.delete(&name).await)?.is_some() {
                info!("✅ {} removed", name);
            }
        }
        Plan::Run {
            name,
            description,
            position,
            hold,
        } => {
            info!(
                "🚀 Spawning {} at ({}, {}, {})",
                name,
                position.x(),
                position.y(),
                position.z()
            );
            settle(
                on_error,
                "spawn",
                client.spawn(&name, &description, position).await,
            )?;

            match hold {
                Some(duration) => {
                    info!("⏳ Holding {} for {:?} (Ctrl+C to stop early)", name, duration);
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {}
                        _ = tokio::signal::ctrl_c() => info!("🛑 Interrupted"),
                    }
                }
                None => {
                    info!("Press Ctrl+C to delete {} and exit", name);
                    tokio::signal::ctrl_c().await?;
                    info!("🛑 Interrupted");
                }
            }

            settle(on_error, "delete", client.delete(&name).await)?;
            info!("👋 Done");
        }
    }

    Ok(())
}
