//! `GitHubProposalClient` against a one-shot local HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use leysync_contrib::{ApiError, GitHubProposalClient, ProposalClient, ProposalRequest};

struct Captured {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

/// Serve exactly one request with `status` and `body`, returning what came in.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            headers.push(line);
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();

        Captured {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(buf).unwrap(),
        }
    });
    (base, handle)
}

fn request() -> ProposalRequest {
    ProposalRequest {
        title: "Community contribution: Updated shared files".into(),
        body: "- a.md".into(),
        head: "contribution/app-2026-01-01-1".into(),
        base: "main".into(),
    }
}

#[test]
fn created_response_yields_html_url() {
    let (base, server) = serve_once(
        "201 Created",
        r#"{"number":7,"html_url":"https://github.example/acme/templates/pull/7"}"#,
    );
    let client = GitHubProposalClient::new(&base, "acme", "templates");

    let url = client.open(&request(), "s3cret").expect("proposal");
    assert_eq!(url, "https://github.example/acme/templates/pull/7");

    let seen = server.join().unwrap();
    assert_eq!(seen.request_line, "POST /repos/acme/templates/pulls HTTP/1.1");
    assert!(seen
        .headers
        .iter()
        .any(|h| h.eq_ignore_ascii_case("authorization: token s3cret")));
    let json: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(json["head"], "contribution/app-2026-01-01-1");
    assert_eq!(json["base"], "main");
}

#[test]
fn error_status_carries_status_and_body() {
    let (base, server) = serve_once(
        "422 Unprocessable Entity",
        r#"{"message":"A pull request already exists"}"#,
    );
    let client = GitHubProposalClient::new(&base, "acme", "templates");

    let err = client.open(&request(), "s3cret").unwrap_err();
    server.join().unwrap();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("already exists"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn success_without_url_is_a_decode_error() {
    let (base, server) = serve_once("200 OK", r#"{"number":7}"#);
    let client = GitHubProposalClient::new(&base, "acme", "templates");
    let err = client.open(&request(), "t").unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
}

#[test]
fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = GitHubProposalClient::new(&format!("http://127.0.0.1:{port}"), "a", "b");
    let err = client.open(&request(), "t").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}
