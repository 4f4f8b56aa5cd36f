use std::io::{self, BufRead, Write};

use crate::app::account::Notifier;
use crate::app::panel::ConfirmPrompt;

/// Prints blocking errors to stderr as a framed block.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn error(&self, title: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "\n!! {title}");
        for line in message.lines() {
            let _ = writeln!(stderr, "!! {line}");
        }
        let _ = writeln!(stderr);
    }
}

/// Asks on stdout and reads a single answer line from stdin.
pub struct StdinConfirm;

impl ConfirmPrompt for StdinConfirm {
    fn confirm(&self, title: &str, message: &str) -> bool {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{title}\n{message} [y/N]: ");
        let _ = stdout.flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
