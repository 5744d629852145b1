//! Client side of the daemon socket: one JSON object per line each way.

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

const STATUS_ATTEMPTS: u32 = 5;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A request line, e.g. `{"cmd":"update","workspace":"/src/app"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DaemonRequest {
    Status,
    /// Force-update the workspace rooted at `workspace`, or all of them.
    Update {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
    },
    Stop,
}

impl DaemonRequest {
    /// Whether the daemon closes the connection after answering.
    pub fn ends_session(&self) -> bool {
        matches!(self, DaemonRequest::Stop)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unwrap the payload, turning an error reply into `DaemonError::Protocol`.
    pub fn into_result(self) -> Result<Value, DaemonError> {
        match (self.ok, self.error) {
            (true, _) => Ok(self.data.unwrap_or(Value::Null)),
            (false, Some(message)) => Err(DaemonError::Protocol(message)),
            (false, None) => Err(DaemonError::Protocol("unknown daemon error".to_string())),
        }
    }
}

fn connect(socket: PathBuf) -> Result<UnixStream, DaemonError> {
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }
    UnixStream::connect(&socket).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset => DaemonError::DaemonNotRunning { socket },
        _ => io_err(&socket, err),
    })
}

/// Send one request to the daemon under `home` and read its single reply.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    let mut stream = connect(socket.clone())?;

    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| io_err(&socket, e))?;

    let mut reply = String::new();
    let read = BufReader::new(stream)
        .read_line(&mut reply)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }
    Ok(serde_json::from_str(reply.trim_end())?)
}

/// Query status. A daemon started a moment ago may not have bound its
/// socket yet, so "not running" is retried a few times.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let mut attempt = 1;
    loop {
        match send_request(home, &DaemonRequest::Status) {
            Ok(response) => return response.into_result(),
            Err(DaemonError::DaemonNotRunning { .. }) if attempt < STATUS_ATTEMPTS => {
                attempt += 1;
                sleep(STATUS_RETRY_DELAY);
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    send_request(home, &DaemonRequest::Stop)?
        .into_result()
        .map(|_| ())
}

/// Force an update of one workspace (by root path) or of all of them.
/// Blocks until every requested cycle has finished.
pub fn request_update(home: &Path, workspace: Option<&Path>) -> Result<Value, DaemonError> {
    let request = DaemonRequest::Update {
        workspace: workspace.map(|p| p.display().to_string()),
    };
    send_request(home, &request)?.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_socket_means_not_running() {
        let home = TempDir::new().unwrap();
        let err = send_request(home.path(), &DaemonRequest::Status).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }

    #[test]
    fn requests_use_a_cmd_tag() {
        let stop = serde_json::to_string(&DaemonRequest::Stop).unwrap();
        assert_eq!(stop, r#"{"cmd":"stop"}"#);

        let all = serde_json::to_string(&DaemonRequest::Update { workspace: None }).unwrap();
        assert_eq!(all, r#"{"cmd":"update"}"#);

        let one: DaemonRequest =
            serde_json::from_str(r#"{"cmd":"update","workspace":"/src/app"}"#).unwrap();
        assert_eq!(
            one,
            DaemonRequest::Update {
                workspace: Some("/src/app".to_string())
            }
        );
    }

    #[test]
    fn unknown_command_does_not_parse() {
        assert!(serde_json::from_str::<DaemonRequest>(r#"{"cmd":"sync"}"#).is_err());
    }

    #[test]
    fn error_reply_becomes_protocol_error() {
        let err = DaemonResponse::error("boom").into_result().unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(msg) if msg == "boom"));
    }
}
