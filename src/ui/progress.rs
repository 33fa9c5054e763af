use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

use crate::downloader::ProgressUpdate;
use crate::util::{format_speed, progress_percent};

const TEMPLATE: &str = "{prefix} {bar:30.cyan/blue} {msg}";

/// One progress bar per transferred file, stacked as files complete.
pub struct TransferBar {
    visible: bool,
    current: Option<(usize, ProgressBar)>,
}

impl TransferBar {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            current: None,
        }
    }

    fn start_file(&mut self, update: &ProgressUpdate) {
        if let Some((_, previous)) = self.current.take() {
            previous.finish();
        }
        let bar = if self.visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_prefix(format!(
            "[{}/{}] {}",
            update.index, update.count, update.file_name
        ));
        self.current = Some((update.index, bar));
    }

    pub fn update(&mut self, update: &ProgressUpdate) {
        if !matches!(self.current, Some((index, _)) if index == update.index) {
            self.start_file(update);
        }
        let Some((_, bar)) = &self.current else {
            return;
        };
        let size = update.total.unwrap_or(update.downloaded);
        bar.set_length(size);
        bar.set_position(update.downloaded);
        bar.set_message(format!(
            "{:5.1}% {} {} {}s",
            progress_percent(update.downloaded, update.total),
            format_speed(update.bytes_per_sec),
            HumanBytes(size),
            update.elapsed.as_secs()
        ));
    }

    pub fn finish(&mut self) {
        if let Some((_, bar)) = self.current.take() {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn update(index: usize, name: &str, downloaded: u64, total: u64) -> ProgressUpdate {
        ProgressUpdate {
            index,
            count: 2,
            file_name: name.into(),
            downloaded,
            total: Some(total),
            bytes_per_sec: 2_048.0,
            elapsed: Duration::from_secs(1),
        }
    }

    fn current(bar: &TransferBar) -> &ProgressBar {
        &bar.current.as_ref().unwrap().1
    }

    #[test]
    fn tracks_position_of_current_file() {
        let mut bar = TransferBar::new(false);
        bar.update(&update(1, "a.MPQ", 512, 1_024));

        let pb = current(&bar);
        assert_eq!(pb.prefix(), "[1/2] a.MPQ");
        assert_eq!(pb.position(), 512);
        assert_eq!(pb.length(), Some(1_024));
        assert!(pb.message().contains(" 50.0%"));
        assert!(pb.message().contains("2.0 KB/s"));
        assert!(pb.message().ends_with(" 1s"));
    }

    #[test]
    fn starts_a_new_bar_for_the_next_file() {
        let mut bar = TransferBar::new(false);
        bar.update(&update(1, "a.MPQ", 1_024, 1_024));
        bar.update(&update(2, "b.MPQ", 10, 100));

        let pb = current(&bar);
        assert_eq!(pb.prefix(), "[2/2] b.MPQ");
        assert_eq!(pb.position(), 10);

        bar.finish();
        assert!(bar.current.is_none());
    }
}
