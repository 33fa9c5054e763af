use std::path::PathBuf;

use crate::Cli;
use crate::updater::{EditionRule, VersionOrder};

pub const DEFAULT_MANIFEST: &str = "manifest.json";
pub const FILTER_FILE: &str = "filter.json";

/// What this invocation does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Sync,
    SaveFilter,
    CreateManifest {
        files_dir: PathBuf,
        base_url: String,
        version: String,
        output: PathBuf,
    },
}

/// Resolved settings for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub manifest_source: String,
    pub root: PathBuf,
    /// Override document; the built-in rules apply when it does not exist.
    pub filter_path: PathBuf,
    pub skip_update: bool,
    pub release_feed: String,
    pub edition: EditionRule,
    pub version_order: VersionOrder,
    pub assume_yes: bool,
    pub launch: Option<String>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let filter_path = cli.filter.unwrap_or_else(|| cli.dir.join(FILTER_FILE));
        let mode = if cli.save_filter {
            Mode::SaveFilter
        } else if cli.create_manifest {
            Mode::CreateManifest {
                files_dir: cli.files,
                base_url: cli.base_url,
                version: cli.manifest_version,
                output: PathBuf::from(&cli.manifest),
            }
        } else {
            Mode::Sync
        };

        Self {
            mode,
            manifest_source: cli.manifest,
            root: cli.dir,
            filter_path,
            skip_update: cli.skip_update,
            release_feed: cli.release_feed,
            edition: EditionRule::from_marker(cli.edition.as_deref()),
            version_order: cli.version_order,
            assume_yes: cli.yes,
            launch: cli.launch,
        }
    }
}
