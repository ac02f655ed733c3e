//! CLI for the bgdl download queue.

mod commands;
mod progress;

use anyhow::Result;
use bgdl_core::{config, store};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_add, run_import, run_queue, run_status};

/// Top-level CLI for the bgdl download queue.
#[derive(Debug, Parser)]
#[command(name = "bgdl")]
#[command(about = "bgdl: persistent background download queue", long_about = None)]
pub struct Cli {
    /// Override `concurrency_limit` from the config file.
    #[arg(long, global = true, value_name = "N")]
    pub limit: Option<usize>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one or more URLs and download until the queue is idle.
    Add {
        /// HTTP/HTTPS (or ftp/file) URLs.
        #[arg(required = true)]
        urls: Vec<String>,
        /// File name to save as (single URL only); derived from the URL path otherwise.
        #[arg(long)]
        name: Option<String>,
        /// Destination directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Queue every entry of a download list (`URL [NAME]` per line) as one batch.
    Import {
        /// Path to the list file.
        path: PathBuf,
        /// Destination directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Resume interrupted and waiting downloads until the queue is idle.
    Run,

    /// Show every request in the queue.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        if let Some(limit) = cli.limit {
            cfg.concurrency_limit = limit;
        }
        tracing::debug!("loaded config: {:?}", cfg);
        let slots = store::open_default(cfg.store_backend).await?;

        match cli.command {
            CliCommand::Add { urls, name, dir } => {
                let dir = resolve_dir(dir)?;
                run_add(&cfg, slots, &urls, name.as_deref(), &dir).await?;
            }
            CliCommand::Import { path, dir } => {
                let dir = resolve_dir(dir)?;
                run_import(&cfg, slots, &path, &dir).await?;
            }
            CliCommand::Run => run_queue(&cfg, slots).await?,
            CliCommand::Status => run_status(&cfg, slots).await?,
        }

        Ok(())
    }
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

#[cfg(test)]
mod tests;
