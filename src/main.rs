use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
#[cfg(feature = "api")]
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use echoline::session::export_srt;
use echoline::subtitles::{merge_tracks_with_tolerance, parse_srt, render_transcript, secondary_only};
use echoline::{Config, DisplayMode, SyncController};

#[derive(Parser)]
#[command(name = "echoline")]
#[command(version, about = "Bilingual subtitle player core and episode server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the player site and the catalog management API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Site root containing index.html, videos/ and subtitles/
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
    /// Parse and merge transcripts, then print the rendered lines
    Inspect {
        /// Primary-language SRT file
        primary: PathBuf,
        /// Secondary-language SRT file
        #[arg(short, long)]
        secondary: Option<PathBuf>,
        /// Display mode: primary, secondary or both
        #[arg(short, long, default_value = "both")]
        mode: DisplayMode,
        /// Write the merged track as SRT
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Regenerate preview images for every catalog episode
    Thumbnails {
        /// Site root
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let loaded = Config::load();
    init_logging(&loaded.config, cli.verbose);
    loaded.log();
    let mut config = loaded.config;

    match cli.command {
        Commands::Serve { port, root } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(root) = root {
                config.server.root_dir = root;
            }
            serve(config).await
        }
        Commands::Inspect {
            primary,
            secondary,
            mode,
            export,
        } => inspect(&config, primary, secondary, mode, export).await,
        Commands::Thumbnails { root } => {
            if let Some(root) = root {
                config.server.root_dir = root;
            }
            thumbnails(config).await
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("echoline={level},warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "api")]
async fn serve(config: Config) -> Result<()> {
    config.validate()?;
    info!("🚀 EchoLine starting...");
    info!("{}", config.summary());

    let server = echoline::api::ApiServer::new(Arc::new(config))?;
    server.start().await
}

#[cfg(not(feature = "api"))]
async fn serve(_config: Config) -> Result<()> {
    Err(anyhow!("echoline was built without the `api` feature"))
}

#[cfg(feature = "api")]
async fn thumbnails(config: Config) -> Result<()> {
    config.validate()?;
    let state = echoline::api::AppState::from_config(Arc::new(config)).await?;
    let report = echoline::api::handlers::generate_thumbnails(&state).await?;

    info!("🎉 Generated {} thumbnails for {} episodes", report.generated, report.total);
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn thumbnails(_config: Config) -> Result<()> {
    Err(anyhow!("echoline was built without the `api` feature"))
}

async fn inspect(
    config: &Config,
    primary: PathBuf,
    secondary: Option<PathBuf>,
    mode: DisplayMode,
    export: Option<PathBuf>,
) -> Result<()> {
    if !primary.exists() {
        return Err(anyhow!("Transcript not found: {}", primary.display()));
    }

    let primary_cues = parse_srt(&tokio::fs::read_to_string(&primary).await?);
    let secondary_cues = match &secondary {
        Some(path) => parse_srt(&tokio::fs::read_to_string(path).await?),
        None => Vec::new(),
    };

    let cues = if primary_cues.is_empty() && !secondary_cues.is_empty() {
        secondary_only(&secondary_cues)
    } else {
        merge_tracks_with_tolerance(
            &primary_cues,
            &secondary_cues,
            config.player.merge_tolerance_seconds,
        )
    };

    let paired = cues.iter().filter(|cue| cue.text_secondary.is_some()).count();
    info!(
        "📊 {} primary cues, {} secondary cues, {} paired",
        primary_cues.len(),
        secondary_cues.len(),
        paired
    );

    for line in render_transcript(&cues, mode) {
        match line.translation {
            Some(translation) => println!("[{}] {} | {}", line.timestamp, line.text, translation),
            None => println!("[{}] {}", line.timestamp, line.text),
        }
    }

    if let Some(path) = export {
        tokio::fs::write(&path, export_srt(&cues, mode)).await?;
        info!("💾 Exported {} cues to {}", cues.len(), path.display());
    }

    let controller = SyncController::with_settings(cues, config.sync_settings());
    info!(
        "✅ Ready: {} cues, loop mode {:?}",
        controller.cues().len(),
        controller.mode()
    );

    Ok(())
}
