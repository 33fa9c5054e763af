use std::io::{self, BufRead};

use console::Term;

use crate::prompt::{self, Confirmation};
use crate::reconcile::ExtraFiles;
use crate::transaction::{Transaction, render_summary};

mod progress;

pub use progress::TransferBar;

/// Everything the user sees on the terminal goes through here.
pub struct Console {
    term: Term,
    input: Box<dyn BufRead>,
    assume_yes: bool,
    show_progress: bool,
}

impl Console {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            term: Term::stdout(),
            input: Box::new(io::stdin().lock()),
            assume_yes,
            show_progress: true,
        }
    }

    /// Console reading answers from `input` and drawing no progress bars.
    #[cfg(test)]
    pub fn scripted(input: &str) -> Self {
        Self {
            term: Term::stdout(),
            input: Box::new(io::Cursor::new(input.as_bytes().to_vec())),
            assume_yes: false,
            show_progress: false,
        }
    }

    pub fn line(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    pub fn print_summary(&self, tx: &Transaction<'_>, extra: &ExtraFiles) {
        let _ = self.term.write_str(&render_summary(tx, extra));
    }

    pub fn confirm(&mut self, question: &str) -> Confirmation {
        if self.assume_yes {
            self.line(&format!("{question}yes"));
            return Confirmation::Confirmed;
        }
        prompt::confirm(question, &mut self.input, &self.term)
    }

    pub fn transfer_bar(&self) -> TransferBar {
        TransferBar::new(self.show_progress)
    }
}
