use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Result;
use crate::networking::{NetworkClient, TransferProgress};
use crate::transaction::Transaction;

/// Progress of the transfer currently running.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// 1-based position among the files being transferred.
    pub index: usize,
    pub count: usize,
    pub file_name: String,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub bytes_per_sec: f64,
    pub elapsed: Duration,
}

impl ProgressUpdate {
    pub fn from_transfer(
        index: usize,
        count: usize,
        file_name: &str,
        transfer: TransferProgress,
    ) -> Self {
        Self {
            index,
            count,
            file_name: file_name.to_owned(),
            downloaded: transfer.downloaded,
            total: transfer.total,
            bytes_per_sec: transfer.bytes_per_sec,
            elapsed: transfer.elapsed,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub files: usize,
    pub bytes: u64,
}

/// Applies a transaction to the working tree, one file at a time.
pub struct DownloadExecutor<'a> {
    client: &'a NetworkClient,
    root: PathBuf,
}

impl<'a> DownloadExecutor<'a> {
    pub fn new(client: &'a NetworkClient, root: impl AsRef<Path>) -> Self {
        Self {
            client,
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Fetch every missing or outdated file in manifest order.
    ///
    /// The first failure stops the run; later files are not attempted and the
    /// partially written file is left in place.
    pub async fn execute<F>(&self, tx: Transaction<'_>, mut progress: F) -> Result<ExecutionReport>
    where
        F: FnMut(ProgressUpdate),
    {
        let count = tx.pending_count();
        let mut report = ExecutionReport::default();
        info!(
            "executor: {count} of {} files need downloading",
            tx.operations().len()
        );

        for (i, op) in tx.pending().enumerate() {
            let index = i + 1;
            let dest = self.root.join(op.path());
            let file_name = op.path().rsplit('/').next().unwrap_or(op.path());
            info!("[{index}/{count}] downloading {} from {}", op.path(), op.entry.url);
            if let Some(local) = &op.local_fingerprint {
                debug!("{}: replacing local content {local}", op.path());
            }

            let written = self
                .client
                .download_to_path(&op.entry.url, &dest, |transfer| {
                    progress(ProgressUpdate::from_transfer(index, count, file_name, transfer));
                })
                .await
                .inspect_err(|err| warn!("download of {} failed: {err}", op.path()))?;

            report.files += 1;
            report.bytes += written;
        }

        info!(
            "executor: {} files, {} bytes transferred",
            report.files, report.bytes
        );
        Ok(report)
    }
}
