//! Interactive confirmation of backfill changes.

use std::io::{self, BufRead, Write};

use ts_core::{Confirm, ProposedChange};

/// Asks on a terminal before each change. Anything but `y`/`yes` declines.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, change: &ProposedChange) -> bool {
        let _ = write!(self.output, "{change}\nConfirm [y/N]: ");
        let _ = self.output.flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read confirmation, declining");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use ts_core::TimesheetEntry;

    fn change() -> ProposedChange {
        ProposedChange::Create(TimesheetEntry::with_times(
            "2024-01-08".parse().unwrap(),
            chrono::NaiveTime::from_hms_opt(9, 0, 0),
            None,
        ))
    }

    #[test]
    fn yes_confirms() {
        let mut output = Vec::new();
        let mut prompt = TerminalPrompt::new(Cursor::new("Y\n"), &mut output);
        assert!(prompt.confirm(&change()));
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "create 2024-01-08: clock in - -> 09:00, clock out - (unchanged)\nConfirm [y/N]: "
        );
    }

    #[test]
    fn anything_else_declines() {
        for answer in ["n\n", "\n", "maybe\n", ""] {
            let mut prompt = TerminalPrompt::new(Cursor::new(answer), Vec::new());
            assert!(!prompt.confirm(&change()), "{answer:?}");
        }
    }
}
