use std::fmt::Write;

use console::Style;
use indicatif::HumanBytes;

use super::{Status, Transaction};
use crate::reconcile::ExtraFiles;

const EXTRA_FILES_SHOWN: usize = 10;

/// Human-readable overview of a transaction, as shown before confirmation.
pub fn render_summary(tx: &Transaction<'_>, extra: &ExtraFiles) -> String {
    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let red = Style::new().red();
    let cyan = Style::new().cyan();

    let mut out = String::new();
    let _ = writeln!(out, "\nManifest Overview:");
    let _ = writeln!(out, " Version: {}", tx.version());

    let _ = writeln!(out, " {}", green.apply_to("Up-to-date files:"));
    for op in tx.with_status(Status::UpToDate) {
        let _ = writeln!(
            out,
            "  {} (Size: {})",
            green.apply_to(op.path()),
            HumanBytes(op.local_size)
        );
    }

    let _ = writeln!(out, "\n {}", yellow.apply_to("Outdated files (will be updated):"));
    for op in tx.with_status(Status::OutOfDate) {
        let _ = writeln!(
            out,
            "  {} (Current Size: {}, New Size: {})",
            yellow.apply_to(op.path()),
            HumanBytes(op.local_size),
            HumanBytes(op.entry.size)
        );
    }

    let _ = writeln!(out, "\n {}", red.apply_to("Missing files (will be downloaded):"));
    for op in tx.with_status(Status::Missing) {
        let _ = writeln!(
            out,
            "  {} (New Size: {})",
            red.apply_to(op.path()),
            HumanBytes(op.entry.size)
        );
    }

    let _ = writeln!(out, "\n {}", cyan.apply_to("Extra files (not in manifest):"));
    for (path, size) in extra.iter().take(EXTRA_FILES_SHOWN) {
        let _ = writeln!(out, "  {} (Size: {})", cyan.apply_to(path), HumanBytes(size));
    }
    if extra.len() > EXTRA_FILES_SHOWN {
        let _ = writeln!(out, "  ...and {} more files", extra.len() - EXTRA_FILES_SHOWN);
    }

    if tx.is_up_to_date() {
        let _ = writeln!(out, "\nAll files are up to date.");
        return out;
    }

    let inbound = HumanBytes(tx.total_download_bytes());
    let _ = writeln!(out, "\nTransaction Summary:");
    let _ = writeln!(out, " Installing/Updating: {} files\n", tx.pending_count());
    let _ = writeln!(
        out,
        "Total size of inbound files is {inbound}. Need to download {inbound}."
    );
    let delta = tx.disk_delta();
    if delta > 0 {
        let _ = writeln!(
            out,
            "After this operation, {} of additional disk space will be used.",
            HumanBytes(delta.unsigned_abs())
        );
    } else {
        let _ = writeln!(
            out,
            "After this operation, {} of disk space will be freed.",
            HumanBytes(delta.unsigned_abs())
        );
    }
    out
}
