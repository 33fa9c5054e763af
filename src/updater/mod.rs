use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::downloader::ProgressUpdate;
use crate::error::{PatchError, Result};
use crate::networking::NetworkClient;

mod replace;

pub use replace::{ReplaceOutcome, SelfReplace, platform_replacer};

pub const DEFAULT_RELEASE_FEED: &str =
    "https://api.github.com/repos/sogladev/manifest-patcher/releases";

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Which release tags belong to this distribution channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditionRule {
    /// Tags without a trailing `-word` marker.
    Plain,
    /// Tags ending with the given marker, e.g. `-ed`.
    Suffix(String),
}

impl EditionRule {
    pub fn from_marker(marker: Option<&str>) -> Self {
        match marker {
            Some(marker) if !marker.is_empty() => Self::Suffix(marker.to_owned()),
            _ => Self::Plain,
        }
    }

    pub fn is_eligible(&self, tag: &str) -> bool {
        match self {
            Self::Plain => !has_edition_suffix(tag),
            Self::Suffix(marker) => tag.ends_with(marker.as_str()),
        }
    }
}

fn has_edition_suffix(tag: &str) -> bool {
    match tag.rsplit_once('-') {
        Some((_, suffix)) => {
            !suffix.is_empty()
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum VersionOrder {
    /// Plain string comparison of the tags.
    #[default]
    Lexical,
    /// Dot-separated numeric components, ignoring a leading `v`.
    Numeric,
}

impl VersionOrder {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Lexical => a.cmp(b),
            Self::Numeric => compare_versions(&normalize_version(a), &normalize_version(b)),
        }
    }
}

/// Normalize version string by removing 'v' prefix and cleaning up.
fn normalize_version(version: &str) -> String {
    version.trim().trim_start_matches('v').to_owned()
}

/// Compare two dotted versions component by component; absent parts count as 0.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = parse_version_parts(a);
    let parts_b = parse_version_parts(b);

    let max_len = parts_a.len().max(parts_b.len());
    for i in 0..max_len {
        let a_part = parts_a.get(i).copied().unwrap_or(0);
        let b_part = parts_b.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Leading digits of each dot-separated part (e.g. "1.2-ed" -> [1, 2]).
fn parse_version_parts(version: &str) -> Vec<u32> {
    version
        .split('.')
        .filter_map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .collect()
}

/// Release asset name for the running platform, e.g. `patcher-linux-amd64`.
pub fn executable_asset_name() -> String {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };
    format!(
        "patcher-{}-{}{}",
        std::env::consts::OS,
        arch,
        std::env::consts::EXE_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub tag: String,
    pub asset_url: String,
}

/// Pick the greatest eligible, non-prerelease release newer than `current`.
pub fn select_candidate(
    releases: &[ReleaseInfo],
    current: &str,
    rule: &EditionRule,
    order: VersionOrder,
    asset_name: &str,
) -> Option<UpdateCandidate> {
    let latest = releases
        .iter()
        .filter(|release| !release.prerelease && rule.is_eligible(&release.tag_name))
        .max_by(|a, b| order.compare(&a.tag_name, &b.tag_name))?;

    if order.compare(&latest.tag_name, current) != Ordering::Greater {
        debug!(
            "update: latest eligible {} is not newer than {current}",
            latest.tag_name
        );
        return None;
    }

    let Some(asset) = latest.assets.iter().find(|asset| asset.name == asset_name) else {
        warn!(
            "update: release {} has no asset named {asset_name}",
            latest.tag_name
        );
        return None;
    };
    Some(UpdateCandidate {
        tag: latest.tag_name.clone(),
        asset_url: asset.browser_download_url.clone(),
    })
}

pub struct UpdateChecker<'a> {
    client: &'a NetworkClient,
    feed_url: String,
    rule: EditionRule,
    order: VersionOrder,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(
        client: &'a NetworkClient,
        feed_url: impl Into<String>,
        rule: EditionRule,
        order: VersionOrder,
    ) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
            rule,
            order,
        }
    }

    pub async fn fetch_latest_eligible(&self, current: &str) -> Result<Option<UpdateCandidate>> {
        info!("update: checking {}", self.feed_url);
        let releases: Vec<ReleaseInfo> = self
            .client
            .fetch_json(&self.feed_url, "release feed")
            .await?;
        debug!("update: feed lists {} releases", releases.len());
        Ok(select_candidate(
            &releases,
            current,
            &self.rule,
            self.order,
            &executable_asset_name(),
        ))
    }

    /// Download the candidate next to `exe` as `<exe>.new`, then hand it to `replacer`.
    ///
    /// A failed or empty download removes the staged file and leaves `exe` untouched.
    pub async fn apply_update<F>(
        &self,
        candidate: &UpdateCandidate,
        exe: &Path,
        replacer: &dyn SelfReplace,
        mut progress: F,
    ) -> Result<ReplaceOutcome>
    where
        F: FnMut(ProgressUpdate),
    {
        let staged = staged_path(exe);
        info!(
            "update: downloading {} to {}",
            candidate.tag,
            staged.display()
        );

        let written = match self
            .client
            .download_to_path(&candidate.asset_url, &staged, |transfer| {
                progress(ProgressUpdate::from_transfer(1, 1, "Updating...", transfer));
            })
            .await
        {
            Ok(written) => written,
            Err(err) => {
                let _ = std::fs::remove_file(&staged);
                return Err(err);
            }
        };
        if written == 0 {
            let _ = std::fs::remove_file(&staged);
            return Err(PatchError::EmptyUpdate { path: staged });
        }

        replacer.replace(&staged, exe)
    }
}

fn staged_path(exe: &Path) -> PathBuf {
    let mut name = exe.file_name().unwrap_or_default().to_os_string();
    name.push(".new");
    exe.with_file_name(name)
}
