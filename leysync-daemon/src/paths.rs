use std::path::{Path, PathBuf};
use std::time::Duration;

use leysync_core::registry::leysync_root;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub const DAEMON_SOCKET: &str = "daemon.sock";

/// File name of the workspace index inside `~/.leysync/`.
pub const INDEX_FILE: &str = "workspaces.yaml";

pub fn socket_path(home: &Path) -> PathBuf {
    leysync_root(home).join(DAEMON_SOCKET)
}
