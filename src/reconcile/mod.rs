use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{PatchError, Result};
use crate::filter::Filter;
use crate::manifest::fingerprint::{self, Algorithm};
use crate::manifest::{Manifest, ManifestEntry};
use crate::transaction::{FileOperation, Status, Transaction};
use crate::util::relative_key;

/// Local files that passed the filter but are not declared by the manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraFiles {
    files: BTreeMap<String, u64>,
}

impl ExtraFiles {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Paths with their sizes, sorted by path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.files.iter().map(|(path, size)| (path.as_str(), *size))
    }
}

#[cfg(test)]
impl FromIterator<(String, u64)> for ExtraFiles {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Every regular file under `root` that the filter keeps, keyed by relative path.
fn scan_local_files(root: &Path, filter: &Filter) -> BTreeMap<String, u64> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("scan: skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = relative_key(root, entry.path()) else {
            continue;
        };
        if filter.is_ignored(&key) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.insert(key, size);
    }
    files
}

fn classify<'m>(root: &Path, entry: &'m ManifestEntry) -> Result<FileOperation<'m>> {
    let local = root.join(&entry.path);
    let algorithm = Algorithm::for_declared(&entry.fingerprint);
    match fingerprint::compute(&local, algorithm) {
        Ok(actual) => {
            let local_size = std::fs::metadata(&local)
                .map_err(|e| PatchError::fs(&local, e))?
                .len();
            let status = if fingerprint::matches(&entry.fingerprint, &actual) {
                Status::UpToDate
            } else {
                debug!(
                    "{}: local {} differs from declared {}",
                    entry.path, actual, entry.fingerprint
                );
                Status::OutOfDate
            };
            Ok(FileOperation {
                entry,
                local_size,
                local_fingerprint: Some(actual),
                status,
            })
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(FileOperation {
            entry,
            local_size: 0,
            local_fingerprint: None,
            status: Status::Missing,
        }),
        Err(err) => Err(PatchError::fs(&local, err)),
    }
}

/// Compare the tree under `root` with `manifest`.
///
/// Classification of each entry only depends on the file at its path, so
/// running this twice over an unchanged tree yields the same transaction.
pub fn reconcile<'m>(
    root: &Path,
    manifest: &'m Manifest,
    filter: &Filter,
) -> Result<(Transaction<'m>, ExtraFiles)> {
    if !root.is_dir() {
        return Err(PatchError::NotFound {
            path: root.to_path_buf(),
        });
    }

    let mut candidates = scan_local_files(root, filter);
    let mut operations = Vec::with_capacity(manifest.files.len());
    for entry in &manifest.files {
        operations.push(classify(root, entry)?);
        candidates.remove(&entry.path);
    }

    let tx = Transaction::new(&manifest.version, operations);
    info!(
        "reconcile: {} up to date, {} outdated, {} missing, {} extra",
        tx.with_status(Status::UpToDate).count(),
        tx.with_status(Status::OutOfDate).count(),
        tx.with_status(Status::Missing).count(),
        candidates.len()
    );
    Ok((tx, ExtraFiles { files: candidates }))
}
