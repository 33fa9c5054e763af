use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{PatchError, Result};
use crate::networking::{NetworkClient, is_remote};
use crate::util::{normalize_separators, relative_key};

pub mod fingerprint;

use fingerprint::Algorithm;

/// One file the remote side expects to exist locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Hash")]
    pub fingerprint: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "Custom", default)]
    pub is_custom: bool,
    #[serde(rename = "URL")]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Files", default)]
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a manifest document and normalize entry paths to forward slashes.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut manifest: Manifest =
            serde_json::from_slice(data).map_err(|e| PatchError::parse("manifest", e))?;
        for entry in &mut manifest.files {
            entry.path = normalize_separators(&entry.path);
            if !is_contained(&entry.path) {
                return Err(PatchError::UnsafePath {
                    path: entry.path.clone(),
                });
            }
        }
        Ok(manifest)
    }

    /// Load from a URL when `source` has an http(s) scheme, from disk otherwise.
    pub async fn load(source: &str, client: &NetworkClient) -> Result<Self> {
        let data = if is_remote(source) {
            info!("manifest: downloading {source}");
            client.fetch_bytes(source).await?
        } else {
            info!("manifest: reading local file {source}");
            tokio::fs::read(source)
                .await
                .map_err(|e| PatchError::fs(source, e))?
        };
        let manifest = Self::from_slice(&data)?;
        info!(
            "manifest: version {} with {} files",
            manifest.version,
            manifest.files.len()
        );
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| PatchError::parse("manifest", e))?;
        fs::write(path, json).map_err(|e| PatchError::fs(path, e))
    }
}

/// True for a relative path that stays inside the directory it is joined to.
fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains(':')
        && path.split('/').all(|part| part != "..")
}

/// Build a manifest describing every file under `files_dir`.
///
/// Entry paths are relative to `files_dir`; each URL is `base_url` followed by the path.
pub fn generate(
    files_dir: &Path,
    base_url: &str,
    version: &str,
    algorithm: Algorithm,
) -> Result<Manifest> {
    if !files_dir.is_dir() {
        return Err(PatchError::NotFound {
            path: files_dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(files_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(files_dir).to_path_buf();
            PatchError::fs(&path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = relative_key(files_dir, entry.path()) else {
            continue;
        };
        let size = entry
            .metadata()
            .map_err(|e| PatchError::fs(entry.path(), e.into()))?
            .len();
        let fingerprint = fingerprint::compute(entry.path(), algorithm)
            .map_err(|e| PatchError::fs(entry.path(), e))?;
        files.push(ManifestEntry {
            url: format!("{base_url}{path}"),
            path,
            fingerprint,
            size,
            is_custom: true,
        });
    }

    info!(
        "manifest: generated {} entries from {}",
        files.len(),
        files_dir.display()
    );
    Ok(Manifest {
        version: version.to_owned(),
        files,
    })
}
