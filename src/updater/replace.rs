use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{PatchError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The staged binary now sits at the executable path.
    Replaced,
    /// The running binary cannot be overwritten; the operator must move the
    /// staged file into place after exit.
    StagedOnly { staged: PathBuf },
}

/// Moves a verified, staged binary over the running executable.
pub trait SelfReplace {
    fn replace(&self, staged: &Path, target: &Path) -> Result<ReplaceOutcome>;
}

/// Atomic rename over the target, for platforms that allow replacing a
/// running executable.
pub struct RenameInPlace;

impl SelfReplace for RenameInPlace {
    fn replace(&self, staged: &Path, target: &Path) -> Result<ReplaceOutcome> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged, fs::Permissions::from_mode(0o755))
                .map_err(|e| PatchError::fs(staged, e))?;
        }
        fs::rename(staged, target).map_err(|e| PatchError::fs(target, e))?;
        info!("self-update: replaced {}", target.display());
        Ok(ReplaceOutcome::Replaced)
    }
}

/// Leaves the staged file next to the executable (Windows).
pub struct ManualReplace;

impl SelfReplace for ManualReplace {
    fn replace(&self, staged: &Path, target: &Path) -> Result<ReplaceOutcome> {
        info!(
            "self-update: {} is in use, leaving update at {}",
            target.display(),
            staged.display()
        );
        Ok(ReplaceOutcome::StagedOnly {
            staged: staged.to_path_buf(),
        })
    }
}

pub fn platform_replacer() -> &'static dyn SelfReplace {
    if cfg!(windows) {
        &ManualReplace
    } else {
        &RenameInPlace
    }
}
