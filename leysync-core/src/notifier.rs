//! The user-facing message surface.
//!
//! The engine never prints. It reports through a [`Notifier`], which the CLI
//! backs with the terminal and the daemon backs with `tracing`.

use std::sync::Mutex;

/// Informational, warning and error messages plus a secret prompt.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    /// Ask for a secret. `None` when no answer is available.
    fn prompt_secret(&self, prompt: &str) -> Option<String>;
}

/// Discards everything and never answers a prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn prompt_secret(&self, _prompt: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Keeps every message in memory. Answers prompts with a fixed secret.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Level, String)>>,
    secret: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            messages: Mutex::default(),
            secret: Some(secret.into()),
        }
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Messages at `level`, in order.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }
    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }
    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
    fn prompt_secret(&self, _prompt: &str) -> Option<String> {
        self.secret.clone()
    }
}
