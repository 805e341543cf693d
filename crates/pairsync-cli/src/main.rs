//! Pair Sync CLI
//!
//! Thin wrapper around pairsync-core for replaying recorded relay traffic
//! and inspecting permission schemas.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a JSON-lines event log and print every notification
//! pairsync replay events.jsonl
//!
//! # Replay with a config file, printing only the final summary
//! pairsync replay events.jsonl --config pairsync.json --quiet
//!
//! # List every permission scope and its fields
//! pairsync schema
//!
//! # List the fields of one scope
//! pairsync schema other-pair
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairsync_core::{
    drain_with_loss, Drained, InboundEvent, PairManager, PairManagerConfig, PairNotification,
    PermissionScope,
};

/// Pair Sync - pair registry and permission reconciliation
#[derive(Parser)]
#[command(name = "pairsync")]
#[command(version = "0.1.0")]
#[command(about = "Pair Sync - pair registry and permission reconciliation")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines file of inbound events against a fresh registry
    Replay {
        /// Event log, one JSON event per line
        file: PathBuf,

        /// JSON config file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only print the final summary
        #[arg(short, long)]
        quiet: bool,

        /// Print notifications as JSON
        #[arg(long)]
        json: bool,

        /// Dispose the registry after the last event
        #[arg(long)]
        dispose: bool,
    },

    /// Show permission fields and their types
    Schema {
        /// Scope to show (e.g. OtherPair, other-pair); all scopes when omitted
        scope: Option<String>,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_notification(notification: &PairNotification, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(notification)?);
        return Ok(());
    }

    match notification {
        PairNotification::UiRefreshRequested => println!("  -> UiRefreshRequested"),
        PairNotification::PresenceChanged { identity, state } => {
            println!("  -> PresenceChanged {} {}", identity, state)
        }
        PairNotification::Informational {
            identity,
            description,
            ..
        } => println!("  -> Informational {} \"{}\"", identity, description),
        PairNotification::OnlineNotification { message, .. } => {
            println!("  -> OnlineNotification \"{}\"", message)
        }
        other => match other.identity() {
            Some(identity) => println!("  -> {} {}", other.name(), identity),
            None => println!("  -> {}", other.name()),
        },
    }
    Ok(())
}

#[derive(Default)]
struct ReplayStats {
    notifications: usize,
    lost: u64,
}

impl ReplayStats {
    fn record(&mut self, drained: Drained, quiet: bool, json: bool) -> Result<()> {
        self.lost += drained.lost;
        for notification in drained.notifications {
            self.notifications += 1;
            if !quiet {
                print_notification(&notification, json)?;
            }
        }
        Ok(())
    }
}

/// Parse the event log, skipping blank lines and `#` comments
fn read_events(file: &Path) -> Result<Vec<(usize, InboundEvent)>> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );

    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event: InboundEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid event on line {}", index + 1))?;
        events.push((index + 1, event));
    }
    Ok(events)
}

fn cmd_replay(
    file: PathBuf,
    config: Option<PathBuf>,
    quiet: bool,
    json: bool,
    dispose: bool,
) -> Result<()> {
    let mut config = match config {
        Some(path) => PairManagerConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PairManagerConfig::default(),
    };

    let events = read_events(&file)?;

    // A clear publishes one offline notification per pair plus a refresh in
    // a single burst; the channel must hold that before we drain.
    let adds = events
        .iter()
        .filter(|(_, event)| matches!(event, InboundEvent::AddPairRelationship { .. }))
        .count();
    config.notification_capacity = config.notification_capacity.max(adds + 1);

    let manager = PairManager::new(config);
    let mut rx = manager.subscribe();

    let mut desyncs = 0usize;
    let mut stats = ReplayStats::default();

    for (line, event) in &events {
        if !quiet && !json {
            match event.identity() {
                Some(identity) => println!("{} {}", event.name(), identity),
                None => println!("{}", event.name()),
            }
        }

        if let Err(err) = manager.dispatch(event.clone()) {
            desyncs += 1;
            if !quiet {
                eprintln!("Desync on line {}: {}", line, err);
            }
        }

        stats.record(drain_with_loss(&mut rx), quiet, json)?;
    }

    if dispose {
        manager.dispose();
        stats.record(drain_with_loss(&mut rx), quiet, json)?;
    }

    if stats.lost > 0 {
        eprintln!("Warning: {} notifications lost to a full channel", stats.lost);
    }

    let registry = manager.registry();
    let direct = registry.direct_pairs();

    println!();
    println!("Replay summary:");
    println!("  Events: {}", events.len());
    println!("  Notifications: {}", stats.notifications);
    println!("  Lost notifications: {}", stats.lost);
    println!("  Desync errors: {}", desyncs);
    println!("  Pairs: {}", registry.len());
    println!("  Direct pairs: {}", direct.len());

    let mut lines: Vec<String> = direct
        .iter()
        .map(|handle| {
            let pair = handle.read();
            let paused = if pair.is_paused() { " (paused)" } else { "" };
            format!(
                "    {} [{}] {}{}",
                pair.display_name(),
                pair.status,
                pair.presence,
                paused
            )
        })
        .collect();
    lines.sort();
    for line in lines {
        println!("{}", line);
    }

    if let Some(last) = registry.last_added() {
        println!("  Last added: {}", last);
    }

    Ok(())
}

fn cmd_schema(scope: Option<String>) -> Result<()> {
    let scopes: Vec<PermissionScope> = match scope {
        Some(name) => vec![name.parse::<PermissionScope>().map_err(anyhow::Error::msg)?],
        None => PermissionScope::ALL.to_vec(),
    };

    for scope in scopes {
        println!("{}:", scope);
        for (name, kind) in scope.schema() {
            println!("  {:<36} {}", name, kind);
        }
        println!();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            file,
            config,
            quiet,
            json,
            dispose,
        } => cmd_replay(file, config, quiet, json, dispose),
        Commands::Schema { scope } => cmd_schema(scope),
    }
}
