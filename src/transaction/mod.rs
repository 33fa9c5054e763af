use crate::manifest::ManifestEntry;

mod summary;

pub use summary::render_summary;

/// Reconciliation verdict for one manifest entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    UpToDate,
    Missing,
    OutOfDate,
}

impl Status {
    pub fn needs_download(self) -> bool {
        matches!(self, Status::Missing | Status::OutOfDate)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileOperation<'m> {
    pub entry: &'m ManifestEntry,
    /// Zero when the file is missing.
    pub local_size: u64,
    pub local_fingerprint: Option<String>,
    pub status: Status,
}

impl FileOperation<'_> {
    pub fn path(&self) -> &str {
        &self.entry.path
    }

    /// Change in bytes on disk once this operation has run.
    pub fn disk_delta(&self) -> i64 {
        if self.status.needs_download() {
            self.entry.size as i64 - self.local_size as i64
        } else {
            0
        }
    }
}

/// Ordered plan produced by one reconciliation pass, in manifest order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction<'m> {
    version: &'m str,
    operations: Vec<FileOperation<'m>>,
}

impl<'m> Transaction<'m> {
    pub fn new(version: &'m str, operations: Vec<FileOperation<'m>>) -> Self {
        Self {
            version,
            operations,
        }
    }

    pub fn version(&self) -> &str {
        self.version
    }

    pub fn operations(&self) -> &[FileOperation<'m>] {
        &self.operations
    }

    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &FileOperation<'m>> {
        self.operations.iter().filter(move |op| op.status == status)
    }

    /// Missing and out-of-date operations, in manifest order.
    pub fn pending(&self) -> impl Iterator<Item = &FileOperation<'m>> {
        self.operations.iter().filter(|op| op.status.needs_download())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn total_download_bytes(&self) -> u64 {
        self.pending().map(|op| op.entry.size).sum()
    }

    /// Net disk usage change; negative when the download frees space.
    pub fn disk_delta(&self) -> i64 {
        self.operations.iter().map(FileOperation::disk_delta).sum()
    }
}
