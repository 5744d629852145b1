//! Terminal-backed [`Notifier`].

use std::io::{self, BufRead, IsTerminal, Write};

use colored::Colorize;

use leysync_core::Notifier;

/// Info on stdout, warnings and errors on stderr. Prompts only on a TTY.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }

    fn error(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
    }

    fn prompt_secret(&self, prompt: &str) -> Option<String> {
        if !io::stdin().is_terminal() {
            return None;
        }
        eprint!("{prompt}: ");
        io::stderr().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let secret = line.trim();
        if secret.is_empty() {
            None
        } else {
            Some(secret.to_string())
        }
    }
}
