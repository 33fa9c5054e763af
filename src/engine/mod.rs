use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::{Config, Mode};
use crate::downloader::DownloadExecutor;
use crate::engine::state::{RunOutcome, RunState};
use crate::error::{PatchError, Result};
use crate::filter::{Filter, default_document};
use crate::manifest::{self, Manifest, fingerprint::Algorithm};
use crate::networking::NetworkClient;
use crate::process::ProcessLauncher;
use crate::prompt::Confirmation;
use crate::reconcile::reconcile;
use crate::ui::Console;
use crate::updater::{ReplaceOutcome, SelfReplace, UpdateChecker, platform_replacer};

pub mod state;

pub const CURRENT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

pub struct PatchEngine {
    pub state: RunState,
    config: Config,
    networking: NetworkClient,
    console: Console,
    current_version: String,
    executable: Option<PathBuf>,
    replacer: &'static dyn SelfReplace,
}

impl PatchEngine {
    pub fn new(config: Config, console: Console) -> Self {
        Self {
            state: RunState::Idle,
            config,
            networking: NetworkClient::new(),
            console,
            current_version: CURRENT_VERSION.to_owned(),
            executable: std::env::current_exe().ok(),
            replacer: platform_replacer(),
        }
    }

    fn set_state(&mut self, state: RunState) {
        debug!("state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        match self.config.mode.clone() {
            Mode::Sync => self.sync().await,
            Mode::SaveFilter => self.save_filter(),
            Mode::CreateManifest {
                files_dir,
                base_url,
                version,
                output,
            } => self.create_manifest(&files_dir, &base_url, &version, output),
        }
    }

    async fn sync(&mut self) -> Result<RunOutcome> {
        if !self.config.skip_update {
            self.set_state(RunState::CheckingUpdate);
            match self.check_for_update().await {
                Ok(Some(tag)) => {
                    self.set_state(RunState::UpdateApplied);
                    return Ok(RunOutcome::SelfUpdated { tag });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("update: {err}");
                    self.console
                        .line(&format!("Update check failed, continuing: {err}"));
                }
            }
        }

        self.set_state(RunState::Reconciling);
        let manifest = Manifest::load(&self.config.manifest_source, &self.networking).await?;
        let filter = Filter::load_or_builtin(&self.config.filter_path)?;
        let (tx, extra) = reconcile(&self.config.root, &manifest, &filter)?;

        self.set_state(RunState::PresentingSummary);
        self.console.print_summary(&tx, &extra);
        if tx.is_up_to_date() {
            self.set_state(RunState::Done);
            self.launch_client()?;
            return Ok(RunOutcome::AlreadyUpToDate);
        }

        self.set_state(RunState::AwaitingConfirmation);
        if self.console.confirm("\nIs this ok [y/N]: ") == Confirmation::Cancelled {
            self.set_state(RunState::Cancelled);
            info!("sync: cancelled by user");
            self.console.line("Operation cancelled.");
            return Ok(RunOutcome::Cancelled);
        }

        self.set_state(RunState::Downloading);
        let mut bar = self.console.transfer_bar();
        let result = DownloadExecutor::new(&self.networking, &self.config.root)
            .execute(tx, |update| bar.update(&update))
            .await;
        bar.finish();
        let report = result?;

        self.set_state(RunState::Done);
        self.console.line(&format!(
            "\nAll files are up to date or successfully downloaded ({} files).",
            report.files
        ));
        self.launch_client()?;
        Ok(RunOutcome::Synced {
            files: report.files,
            bytes: report.bytes,
        })
    }

    /// Offer and apply a newer release. `Ok(Some(tag))` means the run should end.
    async fn check_for_update(&mut self) -> Result<Option<String>> {
        let checker = UpdateChecker::new(
            &self.networking,
            self.config.release_feed.clone(),
            self.config.edition.clone(),
            self.config.version_order,
        );
        let Some(candidate) = checker.fetch_latest_eligible(&self.current_version).await? else {
            info!("update: {} is the latest version", self.current_version);
            return Ok(None);
        };

        self.console.line(&format!(
            "\nNew version available: {} -> {}",
            self.current_version, candidate.tag
        ));
        if self.console.confirm("Do you want to update? [y/N]: ") == Confirmation::Cancelled {
            info!("update: declined {}", candidate.tag);
            return Ok(None);
        }

        let exe = match &self.executable {
            Some(exe) => exe.clone(),
            None => std::env::current_exe().map_err(|e| PatchError::fs("current executable", e))?,
        };
        let mut bar = self.console.transfer_bar();
        let result = checker
            .apply_update(&candidate, &exe, self.replacer, |update| bar.update(&update))
            .await;
        bar.finish();

        match result? {
            ReplaceOutcome::Replaced => self.console.line(&format!(
                "Update completed successfully! Restart the patcher to use {}.",
                candidate.tag
            )),
            ReplaceOutcome::StagedOnly { staged } => self.console.line(&format!(
                "Update downloaded to {}. Replace {} with it after this program exits.",
                staged.display(),
                exe.display()
            )),
        }
        Ok(Some(candidate.tag))
    }

    fn launch_client(&self) -> Result<()> {
        let Some(exe) = &self.config.launch else {
            return Ok(());
        };
        self.console.line(&format!("Launching {exe}..."));
        ProcessLauncher::new(&self.config.root).launch(exe)
    }

    fn save_filter(&mut self) -> Result<RunOutcome> {
        let path = self.config.filter_path.clone();
        default_document().save(&path)?;
        self.console
            .line(&format!("Saved default filter to {}", path.display()));
        self.set_state(RunState::Done);
        Ok(RunOutcome::FilterSaved { path })
    }

    fn create_manifest(
        &mut self,
        files_dir: &Path,
        base_url: &str,
        version: &str,
        output: PathBuf,
    ) -> Result<RunOutcome> {
        let manifest = manifest::generate(files_dir, base_url, version, Algorithm::Sha256)?;
        manifest.save(&output)?;
        self.console.line(&format!(
            "Wrote {} with {} files",
            output.display(),
            manifest.files.len()
        ));
        self.set_state(RunState::Done);
        Ok(RunOutcome::ManifestCreated {
            path: output,
            files: manifest.files.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FILTER_FILE;
    use crate::testutil::TestServer;
    use crate::updater::{EditionRule, VersionOrder, executable_asset_name};
    use std::fs;

    const BODY: &[u8] = b"0123456789";
    const BODY_MD5: &str = "781e5e245d69b566979b86e28d23f2c7";

    fn config(root: &Path, manifest_source: String) -> Config {
        Config {
            mode: Mode::Sync,
            manifest_source,
            root: root.to_path_buf(),
            filter_path: root.join(FILTER_FILE),
            skip_update: true,
            release_feed: String::new(),
            edition: EditionRule::Plain,
            version_order: VersionOrder::Lexical,
            assume_yes: false,
            launch: None,
        }
    }

    fn manifest_doc(url: &str) -> Vec<u8> {
        format!(
            r#"{{"Version": "1.0", "Files": [{{"Path": "Data/a.txt", "Hash": "{BODY_MD5}", "Size": 10, "Custom": false, "URL": "{url}"}}]}}"#
        )
        .into_bytes()
    }

    async fn patch_server() -> TestServer {
        TestServer::start(vec![("/files/a.txt", 200, BODY.to_vec())]).await
    }

    #[tokio::test]
    async fn confirmed_sync_downloads_missing_files() {
        let files = patch_server().await;
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, manifest_doc(&files.url("/files/a.txt"))).unwrap();

        let cfg = config(dir.path(), manifest_path.display().to_string());
        let mut engine = PatchEngine::new(cfg, Console::scripted("y\n"));
        let outcome = engine.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::Synced { files: 1, bytes: 10 });
        assert_eq!(engine.state, RunState::Done);
        assert_eq!(fs::read(dir.path().join("Data").join("a.txt")).unwrap(), BODY);

        let mut again = PatchEngine::new(
            config(dir.path(), manifest_path.display().to_string()),
            Console::scripted(""),
        );
        assert_eq!(again.run().await.unwrap(), RunOutcome::AlreadyUpToDate);
    }

    #[tokio::test]
    async fn declined_confirmation_is_a_clean_cancel() {
        let files = patch_server().await;
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, manifest_doc(&files.url("/files/a.txt"))).unwrap();

        let cfg = config(dir.path(), manifest_path.display().to_string());
        let mut engine = PatchEngine::new(cfg, Console::scripted("n\n"));

        assert_eq!(engine.run().await.unwrap(), RunOutcome::Cancelled);
        assert_eq!(engine.state, RunState::Cancelled);
        assert!(!dir.path().join("Data").join("a.txt").exists());
        assert_eq!(files.hits(), 0);
    }

    #[tokio::test]
    async fn remote_manifest_is_fetched() {
        let files = patch_server().await;
        let doc = manifest_doc(&files.url("/files/a.txt"));
        let manifests = TestServer::start(vec![("/manifest.json", 200, doc)]).await;
        let dir = tempfile::tempdir().unwrap();

        let cfg = config(dir.path(), manifests.url("/manifest.json"));
        let mut engine = PatchEngine::new(cfg, Console::scripted("yes\n"));
        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Synced { files: 1, bytes: 10 });
    }

    #[tokio::test]
    async fn missing_manifest_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), dir.path().join("nope.json").display().to_string());
        let err = PatchEngine::new(cfg, Console::scripted(""))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_update_check_does_not_stop_the_sync() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, br#"{"Version": "1.0", "Files": []}"#).unwrap();

        let mut cfg = config(dir.path(), manifest_path.display().to_string());
        cfg.skip_update = false;
        cfg.release_feed = TestServer::closed_url().await;
        let mut engine = PatchEngine::new(cfg, Console::scripted(""));

        assert_eq!(engine.run().await.unwrap(), RunOutcome::AlreadyUpToDate);
    }

    fn feed_for(asset_url: &str) -> Vec<u8> {
        format!(
            r#"[{{"tag_name": "v9.9.9", "prerelease": false,
                 "assets": [{{"name": "{}", "browser_download_url": "{asset_url}"}}]}}]"#,
            executable_asset_name()
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn declined_update_continues_to_sync() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, br#"{"Version": "1.0", "Files": []}"#).unwrap();
        let feed = TestServer::start(vec![("/releases", 200, feed_for("http://unused/"))]).await;

        let mut cfg = config(dir.path(), manifest_path.display().to_string());
        cfg.skip_update = false;
        cfg.release_feed = feed.url("/releases");
        let mut engine = PatchEngine::new(cfg, Console::scripted("n\n"));
        engine.current_version = "v1.0.0".into();

        assert_eq!(engine.run().await.unwrap(), RunOutcome::AlreadyUpToDate);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn accepted_update_replaces_executable_and_ends_run() {
        let asset = TestServer::start(vec![("/patcher", 200, b"new build".to_vec())]).await;
        let feed = TestServer::start(vec![("/releases", 200, feed_for(&asset.url("/patcher")))]).await;
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("patcher");
        fs::write(&exe, b"old build").unwrap();

        // No manifest exists: the run must end before reconciling.
        let mut cfg = config(dir.path(), dir.path().join("absent.json").display().to_string());
        cfg.skip_update = false;
        cfg.release_feed = feed.url("/releases");
        let mut engine = PatchEngine::new(cfg, Console::scripted("y\n"));
        engine.current_version = "v1.0.0".into();
        engine.executable = Some(exe.clone());

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::SelfUpdated { tag: "v9.9.9".into() });
        assert_eq!(engine.state, RunState::UpdateApplied);
        assert_eq!(fs::read(&exe).unwrap(), b"new build");
    }

    #[tokio::test]
    async fn save_filter_writes_default_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), String::new());
        cfg.mode = Mode::SaveFilter;

        let outcome = PatchEngine::new(cfg, Console::scripted("")).run().await.unwrap();
        let path = dir.path().join(FILTER_FILE);
        assert_eq!(outcome, RunOutcome::FilterSaved { path: path.clone() });
        assert!(Filter::load(&path).unwrap().is_ignored("README.md"));
    }

    #[tokio::test]
    async fn create_manifest_mode_generates_document() {
        let dir = tempfile::tempdir().unwrap();
        let files_dir = dir.path().join("files");
        fs::create_dir_all(files_dir.join("Data")).unwrap();
        fs::write(files_dir.join("Data").join("patch.MPQ"), b"hello").unwrap();
        let output = dir.path().join("manifest.json");

        let mut cfg = config(dir.path(), String::new());
        cfg.mode = Mode::CreateManifest {
            files_dir,
            base_url: "http://cdn/".into(),
            version: "2.0".into(),
            output: output.clone(),
        };
        let outcome = PatchEngine::new(cfg, Console::scripted("")).run().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::ManifestCreated {
                path: output.clone(),
                files: 1
            }
        );

        let manifest = Manifest::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(manifest.version, "2.0");
        assert_eq!(manifest.files[0].url, "http://cdn/Data/patch.MPQ");
    }
}
