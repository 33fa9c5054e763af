use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::error::{PatchError, Result};

/// Starts the game client from the working tree once it is in sync.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    root: PathBuf,
}

impl ProcessLauncher {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    /// Run `exe` to completion, through wine on hosts other than Windows.
    pub fn launch(&self, exe: &str) -> Result<()> {
        let client_path = self.root.join(exe);
        if !client_path.is_file() {
            warn!("launch: client not found at {}", client_path.display());
            return Err(PatchError::NotFound { path: client_path });
        }

        let wine = if cfg!(windows) {
            None
        } else {
            Some(find_on_path("wine").ok_or_else(|| PatchError::NotFound {
                path: PathBuf::from("wine"),
            })?)
        };

        let mut cmd = self.command(&client_path, wine.as_deref());
        debug!("launch: {cmd:?}");
        info!("launch: starting {}", client_path.display());

        let status = cmd.status().map_err(|e| PatchError::fs(&client_path, e))?;
        if !status.success() {
            return Err(PatchError::FileSystem {
                path: client_path,
                source: io::Error::other(format!("client exited with {status}")),
            });
        }
        info!("launch: client exited cleanly");
        Ok(())
    }

    fn command(&self, client_path: &Path, wine: Option<&Path>) -> Command {
        let mut cmd = match wine {
            Some(wine) => {
                let mut command = Command::new(wine);
                command
                    .arg(client_path)
                    .env("WINEPREFIX", self.root.join(".wine"));
                command
            }
            None => Command::new(client_path),
        };
        cmd.current_dir(&self.root);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn wine_command_sets_prefix_inside_tree() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(dir.path());
        let exe = launcher.root.join("Game.exe");

        let cmd = launcher.command(&exe, Some(Path::new("/usr/bin/wine")));
        assert_eq!(cmd.get_program(), OsStr::new("/usr/bin/wine"));
        assert_eq!(cmd.get_args().collect::<Vec<_>>(), [exe.as_os_str()]);
        assert_eq!(cmd.get_current_dir(), Some(launcher.root.as_path()));
        let prefix = cmd
            .get_envs()
            .find(|(key, _)| *key == OsStr::new("WINEPREFIX"))
            .and_then(|(_, value)| value);
        assert_eq!(prefix, Some(launcher.root.join(".wine").as_os_str()));
    }

    #[test]
    fn native_command_runs_client_directly() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(dir.path());
        let exe = launcher.root.join("Game.exe");

        let cmd = launcher.command(&exe, None);
        assert_eq!(cmd.get_program(), exe.as_os_str());
        assert_eq!(cmd.get_args().count(), 0);
    }

    #[test]
    fn missing_client_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcessLauncher::new(dir.path()).launch("Game.exe").unwrap_err();
        assert!(matches!(err, PatchError::NotFound { ref path } if path.ends_with("Game.exe")));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let launcher = ProcessLauncher::new(".");
        assert!(launcher.root.is_absolute());
    }
}
