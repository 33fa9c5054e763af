use std::path::PathBuf;

/// Where a run currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    CheckingUpdate,
    UpdateApplied,
    Reconciling,
    PresentingSummary,
    AwaitingConfirmation,
    Downloading,
    Cancelled,
    Done,
}

/// How a run ended. Every variant is a clean exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Synced { files: usize, bytes: u64 },
    AlreadyUpToDate,
    Cancelled,
    SelfUpdated { tag: String },
    FilterSaved { path: PathBuf },
    ManifestCreated { path: PathBuf, files: usize },
}
