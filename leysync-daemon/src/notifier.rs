//! [`Notifier`] backed by `tracing`, for workspaces driven by the daemon.

use leysync_core::Notifier;

/// Logs every user-facing message with the workspace name attached.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    workspace: String,
}

impl TracingNotifier {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        tracing::info!(workspace = %self.workspace, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(workspace = %self.workspace, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(workspace = %self.workspace, "{message}");
    }

    /// The daemon has no terminal; credentials must come from the environment.
    fn prompt_secret(&self, prompt: &str) -> Option<String> {
        tracing::warn!(
            workspace = %self.workspace,
            prompt,
            "cannot prompt from the daemon; set GITHUB_TOKEN in its environment",
        );
        None
    }
}
