//! awgctl: AmneziaWG tunnel control
//!
//! Command-line front end for the quick-tool backend. Tunnel configs are
//! read from `.conf` files; the tunnel name is the file stem.

use anyhow::{Context, Result, bail};
use awg_backend::{AwgQuickBackend, BackendSettings, StatusCallback, Tunnel, TunnelState};
use awg_config::{Config, KeyPair};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "awgctl", version, about = "Control AmneziaWG tunnels through awg-quick")]
struct Cli {
    /// Backend settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring a tunnel up
    ///
    /// Other tunnels are only stopped if this same invocation started them;
    /// tunnels left running by earlier awgctl runs keep running.
    Up(Transition),
    /// Bring a tunnel down
    Down(Transition),
    /// Flip a tunnel's state
    ///
    /// Bringing a tunnel up this way never stops tunnels started by earlier
    /// awgctl runs.
    Toggle(Transition),
    /// List running tunnels
    List,
    /// Show transfer statistics
    Stats {
        name: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the latest handshake
    Handshake { name: String },
    /// Print a config in quick or engine form
    Render {
        config: PathBuf,
        /// Print the engine's key=value form
        #[arg(long)]
        userspace: bool,
    },
    /// Validate a config file
    Check { config: PathBuf },
    /// Print the kernel module version
    Version,
    /// Generate a key pair
    Genkey,
}

#[derive(clap::Args)]
struct Transition {
    config: PathBuf,

    /// Wait up to SECS for the first handshake after bringing the tunnel up
    #[arg(long, value_name = "SECS")]
    wait: Option<u64>,
}

/// Tunnel handle named after its config file
struct NamedTunnel {
    name: String,
}

impl Tunnel for NamedTunnel {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_state_change(&self, state: TunnelState) {
        info!("{} is now {}", self.name, state);
    }
}

#[derive(Serialize)]
struct PeerReport {
    public_key: String,
    rx_bytes: u64,
    tx_bytes: u64,
    latest_handshake_millis: i64,
}

#[derive(Serialize)]
struct StatsReport {
    tunnel: String,
    total_rx: u64,
    total_tx: u64,
    peers: Vec<PeerReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let settings = match &cli.settings {
        Some(path) => BackendSettings::from_toml_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => BackendSettings::default(),
    };
    debug!("Settings: {:?}", settings);

    match cli.command {
        Command::Up(args) => transition(settings, args, TunnelState::Up).await,
        Command::Down(args) => transition(settings, args, TunnelState::Down).await,
        Command::Toggle(args) => transition(settings, args, TunnelState::Toggle).await,
        Command::List => {
            let backend = AwgQuickBackend::with_process_shell(settings);
            for name in backend.get_running_tunnel_names().await {
                println!("{name}");
            }
            Ok(())
        }
        Command::Stats { name, json } => stats(settings, name, json).await,
        Command::Handshake { name } => {
            let backend = AwgQuickBackend::with_process_shell(settings);
            let status = backend.get_last_handshake(&NamedTunnel { name }).await;
            println!("{} ({})", status.sentinel(), status);
            Ok(())
        }
        Command::Render { config, userspace } => {
            let config = load_config(&config)?;
            if userspace {
                print!("{}", config.to_awg_userspace_string());
            } else {
                print!("{}", config.to_awg_quick_string());
            }
            Ok(())
        }
        Command::Check { config } => {
            let parsed = load_config(&config)?;
            println!("{}: OK {}", config.display(), parsed);
            Ok(())
        }
        Command::Version => {
            let backend = AwgQuickBackend::with_process_shell(settings);
            if !backend.has_kernel_support() {
                warn!("{} not found", backend.settings().module_dir.display());
            }
            println!("{}", backend.get_version().await?);
            Ok(())
        }
        Command::Genkey => {
            let pair = KeyPair::generate();
            println!("PrivateKey = {}", pair.private_key().to_base64());
            println!("PublicKey = {}", pair.public_key());
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Config::parse(&text).with_context(|| format!("parsing {}", path.display()))
}

fn tunnel_name(path: &Path) -> Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => bail!("cannot derive a tunnel name from {}", path.display()),
    }
}

async fn transition(settings: BackendSettings, args: Transition, requested: TunnelState) -> Result<()> {
    let config = Arc::new(load_config(&args.config)?);
    let tunnel: Arc<dyn Tunnel> = Arc::new(NamedTunnel {
        name: tunnel_name(&args.config)?,
    });

    let mut backend = AwgQuickBackend::with_process_shell(settings);
    let connected = Arc::new(Notify::new());
    let signal = connected.clone();
    let callback: Arc<dyn StatusCallback> = Arc::new(move |up: bool| {
        if up {
            signal.notify_one();
        }
    });
    backend.set_status_callback(callback);

    let state = backend.set_state(&tunnel, requested, Some(config)).await?;
    println!("{} {}", tunnel.name(), state);

    if let (Some(secs), TunnelState::Up) = (args.wait, state) {
        match tokio::time::timeout(Duration::from_secs(secs), connected.notified()).await {
            Ok(()) => println!("{} connected", tunnel.name()),
            Err(_) => bail!("no handshake within {secs}s"),
        }
    }
    Ok(())
}

async fn stats(settings: BackendSettings, name: String, json: bool) -> Result<()> {
    let backend = AwgQuickBackend::with_process_shell(settings);
    let tunnel = NamedTunnel { name };
    let stats = backend.get_statistics(&tunnel).await;

    if json {
        let report = StatsReport {
            tunnel: tunnel.name.clone(),
            total_rx: stats.total_rx(),
            total_tx: stats.total_tx(),
            peers: stats
                .peers()
                .iter()
                .map(|p| PeerReport {
                    public_key: p.public_key.to_base64(),
                    rx_bytes: p.rx_bytes,
                    tx_bytes: p.tx_bytes,
                    latest_handshake_millis: p.latest_handshake_millis,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}: {}", tunnel.name, stats.format());
        for peer in stats.peers() {
            println!(
                "  {} rx={} tx={} handshake={}",
                peer.public_key, peer.rx_bytes, peer.tx_bytes, peer.latest_handshake_millis
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_tunnel_name_from_file_stem() {
        assert_eq!(tunnel_name(Path::new("/etc/amnezia/office.conf")).unwrap(), "office");
        assert!(tunnel_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_cli_parses_transition() {
        let cli = Cli::try_parse_from(["awgctl", "-v", "up", "office.conf", "--wait", "5"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Up(args) => {
                assert_eq!(args.config, PathBuf::from("office.conf"));
                assert_eq!(args.wait, Some(5));
            }
            _ => panic!("expected up"),
        }
    }

    #[test]
    fn test_up_help_states_exclusivity_scope() {
        let mut command = Cli::command();
        let up = command.find_subcommand_mut("up").unwrap();
        let help = up.render_long_help().to_string();
        assert!(help.contains("earlier"));

        let toggle = command.find_subcommand_mut("toggle").unwrap();
        assert!(toggle.render_long_help().to_string().contains("earlier"));
    }
}
