use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keelhaul_core::{
    load_config, load_tracker_profiles, validate_config, DisabledHardlinkChecker, DryRunApplier,
    FsHardlinkChecker, HardlinkChecker, PlanApplier, QBittorrentClient, SnapshotSource,
    TorrentManager,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "keelhaul",
    version,
    about = "Tracker-aware tagging, cross-seed detection and retention for a qBittorrent fleet"
)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "config.toml", env = "KEELHAUL_CONFIG")]
    config: PathBuf,

    /// Classify and log only, apply nothing
    #[arg(short = 'd', long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify the fleet and reconcile tags, limits and categories
    Tag {
        /// Print the full classification record for these hashes
        /// (comma-separated) after the cycle
        #[arg(long)]
        explain: Option<String>,
    },
    /// Remove every torrent carrying a delete tag
    Sweep {
        /// Tag to sweep
        #[arg(long, default_value = "_delete_ready")]
        tag: String,
        /// Also delete downloaded files (default leaves them for orphan
        /// cleanup)
        #[arg(long)]
        delete_files: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("keelhaul {}", VERSION);

    // Load configuration
    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Compute config hash for the startup log line
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (hash {})", &config_hash[..16]);

    // Load tracker profiles; classification cannot run without them
    let profiles = load_tracker_profiles(&config.options.tracker_config)
        .with_context(|| {
            format!(
                "Failed to load tracker profiles from {:?}",
                config.options.tracker_config
            )
        })?;
    info!("Loaded {} tracker profiles", profiles.len());

    // Build the client; it serves both the fetch and the apply side
    let client = Arc::new(
        QBittorrentClient::new(config.qbittorrent.clone())
            .context("Failed to create qBittorrent client")?,
    );
    let source: Arc<dyn SnapshotSource> = client.clone();

    let applier: Arc<dyn PlanApplier> = if args.dry_run {
        info!("Dry-run mode: no changes will be applied");
        Arc::new(DryRunApplier)
    } else {
        client
    };

    let hardlinks: Arc<dyn HardlinkChecker> = if config.options.tag_hardlinks {
        Arc::new(FsHardlinkChecker::new())
    } else {
        Arc::new(DisabledHardlinkChecker)
    };

    let manager = TorrentManager::new(
        source,
        applier,
        hardlinks,
        profiles,
        config.options.clone(),
    );

    match args.command.unwrap_or(Command::Tag { explain: None }) {
        Command::Tag { explain } => {
            let report = manager.run_cycle().await.context("Classification failed")?;
            info!(
                "Classified {} torrents, {} need updates",
                report.batch.torrents.len(),
                report.changed()
            );

            manager.apply(&report).await;

            if let Some(hashes) = explain {
                for hash in hashes.split(',').map(str::trim).filter(|h| !h.is_empty()) {
                    match report.assessment(hash) {
                        Some(assessment) => {
                            let rendered = serde_json::to_string_pretty(assessment)
                                .unwrap_or_else(|e| format!("<unserializable: {}>", e));
                            println!("{}:\n{}", hash, rendered);
                        }
                        None => println!("WARNING: Torrent with hash {} not found", hash),
                    }
                }
            }
        }
        Command::Sweep { tag, delete_files } => {
            let outcome = manager.sweep(&tag, delete_files).await?;
            info!(
                "Removed {} torrents tagged '{}'",
                outcome.removed.len(),
                tag
            );
        }
    }

    Ok(())
}
