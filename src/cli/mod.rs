//! Command-line interface for clipvault.
//!
//! Provides commands for encoding originals, rebuilding the output tree,
//! migrating legacy layouts and inspecting the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{FfmpegTranscoder, Transcoder};
use crate::config::Settings;
use crate::core::{self as pipeline, DeriveMode, Deriver};
use crate::store::{self, ContentRoot};

/// clipvault - Content-addressed store for glitcher video clips
#[derive(Parser, Debug)]
#[command(name = "clipvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: discover .clipvault/config.yaml upwards)
    #[arg(long, global = true, env = "CLIPVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode only new videos
    Encode {
        /// Originals to encode (directories are skipped)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// (Re)encode specified videos, replacing existing artifacts
    Reencode {
        /// Originals to reencode (directories are skipped)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rebuild the output link tree of a content folder
    #[command(alias = "symlink")]
    Project {
        /// Content folder
        content_folder: PathBuf,
    },

    /// Migrate an old original/encoded/thumbnails layout into a content folder
    Ingest {
        /// Content folder
        content_folder: PathBuf,

        /// Old structure content folder
        old_folder: PathBuf,
    },

    /// Create an empty content folder
    Init {
        /// Directory to turn into a content folder
        content_folder: PathBuf,
    },

    /// List stored artifacts and the originals they belong to
    Inventory {
        /// Content folder
        content_folder: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    ///
    /// Settings are only loaded for commands that read them, so a broken
    /// config file does not block `ingest`, `init` or `inventory`.
    pub async fn execute(self) -> Result<()> {
        let config = self.config;
        let settings = || Settings::load(config.as_deref());

        match self.command {
            Commands::Encode { files } => {
                encode(&settings()?, &files, DeriveMode::SkipIfExists).await
            }
            Commands::Reencode { files } => {
                encode(&settings()?, &files, DeriveMode::ForceReencode).await
            }
            Commands::Project { content_folder } => {
                project(&settings()?, &content_folder).await
            }
            Commands::Ingest {
                content_folder,
                old_folder,
            } => ingest(&content_folder, &old_folder).await,
            Commands::Init { content_folder } => init(&content_folder).await,
            Commands::Inventory {
                content_folder,
                json,
            } => inventory(&content_folder, json).await,
            Commands::Config => show_config(&settings()?),
        }
    }
}

/// Derive artifacts for the given originals
async fn encode(settings: &Settings, files: &[PathBuf], mode: DeriveMode) -> Result<()> {
    let transcoder = FfmpegTranscoder::new(settings.ffmpeg.clone(), settings.transcode.clone());
    transcoder
        .health_check()
        .await
        .context("Transcoder is not usable")?;

    let deriver = Deriver::new(Arc::new(transcoder));
    let report = deriver.derive(files, mode).await?;

    eprintln!("\n[encode: {}]", report);
    Ok(())
}

/// Rebuild the output tree
async fn project(settings: &Settings, content_folder: &Path) -> Result<()> {
    let report = pipeline::project(content_folder, &settings.exclusion_suffix)
        .await
        .with_context(|| format!("Failed to project {}", content_folder.display()))?;

    eprintln!("\n[project: {}]", report);
    Ok(())
}

/// Migrate a legacy layout
async fn ingest(content_folder: &Path, old_folder: &Path) -> Result<()> {
    let report = pipeline::ingest(content_folder, old_folder)
        .await
        .with_context(|| {
            format!(
                "Failed to ingest {} into {}",
                old_folder.display(),
                content_folder.display()
            )
        })?;

    for entry in report.conflicts() {
        println!(
            "CONFLICT {} -> {}",
            entry.source.display(),
            entry.target.display()
        );
    }
    eprintln!("\n[ingest: {}]", report);
    Ok(())
}

/// Create a content folder
async fn init(content_folder: &Path) -> Result<()> {
    let root = ContentRoot::init(content_folder).await?;
    println!("Initialized content folder at {}", root.path().display());
    Ok(())
}

/// Print the store inventory
async fn inventory(content_folder: &Path, json: bool) -> Result<()> {
    let root = ContentRoot::open(content_folder)?;
    let inventory = store::inventory(&root).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    if inventory.entries.is_empty() && inventory.underived.is_empty() {
        println!("Store is empty");
        return Ok(());
    }

    println!(
        "{:<14} {:<5} {:<5} {:>12} {:<25} ORIGINALS",
        "DIGEST", "H264", "PNG", "BYTES", "MODIFIED"
    );
    println!("{}", "-".repeat(90));

    for entry in &inventory.entries {
        let originals = if entry.is_orphaned() {
            "(orphaned)".to_string()
        } else {
            entry
                .originals
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{:<14} {:<5} {:<5} {:>12} {:<25} {}",
            entry.digest.short(),
            if entry.encoded { "yes" } else { "-" },
            if entry.thumbnail { "yes" } else { "-" },
            entry.bytes,
            entry
                .modified
                .map(|m| m.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            originals
        );
    }

    if !inventory.underived.is_empty() {
        println!("\nNot yet encoded:");
        for path in &inventory.underived {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(settings: &Settings) -> Result<()> {
    println!("clipvault configuration");
    println!("=======================\n");

    if let Some(ref path) = settings.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: (none found, using defaults)");
    }

    println!("\n{}", serde_yaml::to_string(settings)?);
    Ok(())
}
