//! Upstream request builder and client-header filter (component C).
//!
//! Mirrors the header loop in the original `handle_client_connection`: five
//! hop-by-hop headers are always replaced with fixed values, `Host` is
//! forwarded verbatim if the client sent one and synthesized otherwise, and
//! everything else passes through unchanged.

use tokio::io::{AsyncBufRead, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{
    ACCEPT_ENCODING_HDR, ACCEPT_HDR, CONNECTION_HDR, PROXY_CONNECTION_HDR, USER_AGENT_HDR,
};
use crate::lineio::read_line_bounded;
use crate::request::ParsedRequest;

/// Reads client request headers up to and including the terminating blank
/// line. The request line itself has already been consumed by the caller.
/// Each header line is bounded by `MAXLINE` (see [`crate::lineio`]).
pub async fn read_client_headers<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Vec<String>> {
    let mut headers = Vec::new();
    loop {
        let line = match read_line_bounded(reader).await? {
            Some(line) => line,
            None => break,
        };
        if line == "\r\n" || line == "\n" {
            break;
        }
        headers.push(line);
    }
    Ok(headers)
}

fn is_filtered(line: &str) -> bool {
    line.starts_with("User-Agent: ")
        || line.starts_with("Accept: ")
        || line.starts_with("Accept-Encoding: ")
        || line.starts_with("Connection: ")
        || line.starts_with("Proxy-Connection: ")
}

fn is_host(line: &str) -> bool {
    line.to_ascii_lowercase().starts_with("host:")
}

/// Builds the sanitized HTTP/1.0 request and writes it to `upstream`.
pub async fn forward_request(
    upstream: &mut TcpStream,
    req: &ParsedRequest,
    client_headers: &[String],
) -> std::io::Result<()> {
    let mut out = String::with_capacity(256);
    out.push_str(&format!("GET {} HTTP/1.0\r\n", req.path));

    out.push_str(USER_AGENT_HDR);
    out.push_str(ACCEPT_HDR);
    out.push_str(ACCEPT_ENCODING_HDR);
    out.push_str(CONNECTION_HDR);
    out.push_str(PROXY_CONNECTION_HDR);

    let mut host_seen = false;
    for line in client_headers {
        if is_filtered(line) {
            continue;
        }
        if is_host(line) {
            host_seen = true;
        }
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\r\n");
        }
    }

    if !host_seen {
        out.push_str(&format!("Host: {}\r\n", req.host));
    }

    out.push_str("\r\n");

    upstream.write_all(out.as_bytes()).await?;
    upstream.flush().await
}
