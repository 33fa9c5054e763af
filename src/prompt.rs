use std::io::{BufRead, Write};

use log::debug;

/// Answer to a yes/no question. Declining is a normal outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// Ask `question` and read one line of `input`.
///
/// Only `y` or `yes` (any case, surrounding whitespace ignored) confirms.
/// End of input and read errors cancel.
pub fn confirm(question: &str, mut input: impl BufRead, mut out: impl Write) -> Confirmation {
    let _ = write!(out, "{question}");
    let _ = out.flush();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => {
            debug!("prompt: end of input");
            Confirmation::Cancelled
        }
        Ok(_) => match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Confirmation::Confirmed,
            _ => Confirmation::Cancelled,
        },
        Err(err) => {
            debug!("prompt: failed to read answer: {err}");
            Confirmation::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(text: &str) -> Confirmation {
        confirm("Continue? [y/N]: ", Cursor::new(text.as_bytes()), Vec::new())
    }

    #[test]
    fn affirmative_answers_confirm() {
        assert_eq!(answer("y\n"), Confirmation::Confirmed);
        assert_eq!(answer("  YES \r\n"), Confirmation::Confirmed);
        assert_eq!(answer("Y"), Confirmation::Confirmed);
    }

    #[test]
    fn anything_else_cancels() {
        assert_eq!(answer("n\n"), Confirmation::Cancelled);
        assert_eq!(answer("\n"), Confirmation::Cancelled);
        assert_eq!(answer("yep\n"), Confirmation::Cancelled);
        assert_eq!(answer(""), Confirmation::Cancelled);
    }

    #[test]
    fn writes_the_question() {
        let mut out = Vec::new();
        confirm("Proceed? ", Cursor::new(b"n\n".to_vec()), &mut out);
        assert_eq!(out, b"Proceed? ");
    }
}
