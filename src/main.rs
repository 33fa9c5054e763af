use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

mod config;
mod downloader;
mod engine;
mod error;
mod filter;
mod manifest;
mod networking;
mod process;
mod prompt;
mod reconcile;
#[cfg(test)]
mod testutil;
mod transaction;
mod ui;
mod updater;
mod util;

use crate::config::Config;
use crate::engine::PatchEngine;
use crate::engine::state::RunOutcome;
use crate::updater::{DEFAULT_RELEASE_FEED, VersionOrder};

#[derive(Parser, Debug)]
#[command(
    name = "patcher",
    author,
    version,
    about = "Keeps a game directory in sync with a remote file manifest"
)]
struct Cli {
    /// Path or http(s) URL of the manifest document.
    #[arg(long, default_value = config::DEFAULT_MANIFEST)]
    manifest: String,

    /// Working tree to reconcile.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Filter override document (default: filter.json inside --dir).
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Write the default filter document to the filter path and exit.
    #[arg(long)]
    save_filter: bool,

    /// Do not check the release feed for a newer patcher.
    #[arg(long)]
    skip_update: bool,

    #[arg(long, default_value = DEFAULT_RELEASE_FEED)]
    release_feed: String,

    /// Only consider release tags ending with this marker, e.g. "-ed".
    #[arg(long, allow_hyphen_values = true)]
    edition: Option<String>,

    #[arg(long, value_enum, default_value_t = VersionOrder::Lexical)]
    version_order: VersionOrder,

    #[arg(long, default_value = "info",
          value_parser = ["error", "warn", "info", "debug", "trace"])]
    log_level: String,

    /// Answer yes to every prompt.
    #[arg(short, long)]
    yes: bool,

    /// Game client to start (relative to --dir) once the tree is in sync.
    #[arg(long, value_name = "EXE")]
    launch: Option<String>,

    /// Generate a manifest for --files and write it to --manifest, then exit.
    #[arg(long)]
    create_manifest: bool,

    #[arg(long, default_value = "files")]
    files: PathBuf,

    #[arg(long, default_value = "http://localhost:8080/")]
    base_url: String,

    #[arg(long, default_value = "1.0")]
    manifest_version: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level.as_str())).init();

    let config = Config::from(cli);
    let console = ui::Console::new(config.assume_yes);
    let mut engine = PatchEngine::new(config, console);

    match engine.run().await {
        Ok(outcome) => {
            match outcome {
                RunOutcome::Synced { files, bytes } => {
                    info!("finished: {files} files, {bytes} bytes downloaded")
                }
                RunOutcome::AlreadyUpToDate => info!("finished: already up to date"),
                RunOutcome::Cancelled => info!("finished: cancelled"),
                RunOutcome::SelfUpdated { tag } => info!("finished: updated patcher to {tag}"),
                RunOutcome::FilterSaved { path } => {
                    info!("finished: filter written to {}", path.display())
                }
                RunOutcome::ManifestCreated { path, files } => {
                    info!("finished: {} lists {files} files", path.display())
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            if err.is_network() {
                eprintln!("Check the network connection and the manifest or release feed URL.");
            }
            ExitCode::FAILURE
        }
    }
}
