//! Response streamer with capture buffer and overflow latch (component D).
//!
//! Copies bytes from the upstream socket to the client socket as they
//! arrive, mirroring them into a capture buffer at the same time. Once the
//! capture buffer would grow past `MAX_OBJECT_SIZE` it is dropped and
//! capturing stops for the rest of the response — but forwarding to the
//! client continues unchanged, so a client never sees a truncated response
//! just because the proxy decided not to cache it.
//!
//! Every read from upstream is wrapped in [`UPSTREAM_IDLE_TIMEOUT`]; the
//! original source has no such guard (O5 in DESIGN.md), so this is the one
//! place behavior is deliberately extended beyond it.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::cache::Cache;
use crate::config::{MAX_OBJECT_SIZE, UPSTREAM_IDLE_TIMEOUT};
use crate::error::ProxyError;

const READ_CHUNK: usize = 16 * 1024;

/// Streams the upstream response to `client`, caching it under
/// `(host, path)` if it completes cleanly and never exceeded
/// `MAX_OBJECT_SIZE`.
pub async fn stream_response(
    upstream: &mut TcpStream,
    client: &mut TcpStream,
    host: &str,
    path: &str,
    cache: &Cache,
) -> Result<(), ProxyError> {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut captured: Vec<u8> = Vec::new();
    let mut overflowed = false;

    loop {
        let n = match timeout(UPSTREAM_IDLE_TIMEOUT, upstream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ProxyError::UpstreamStream(e)),
            Err(_) => {
                return Err(ProxyError::UpstreamStream(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "upstream read timed out",
                )))
            }
        };

        if n == 0 {
            break;
        }

        client
            .write_all(&buf[..n])
            .await
            .map_err(ProxyError::ClientWrite)?;

        if !overflowed {
            if captured.len() + n >= MAX_OBJECT_SIZE {
                overflowed = true;
                captured = Vec::new();
            } else {
                captured.extend_from_slice(&buf[..n]);
            }
        }
    }

    client.flush().await.map_err(ProxyError::ClientWrite)?;

    if !overflowed {
        cache.insert(host.to_string(), path.to_string(), captured);
    }

    Ok(())
}
