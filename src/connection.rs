//! Per-connection orchestration (component F).
//!
//! One task per accepted connection: read the request line and headers,
//! parse, consult the cache, and either serve a cached copy or open an
//! upstream connection and stream/cache the response. Every error is
//! contained here — nothing propagates back to the accept loop.

use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::cache::Cache;
use crate::error::{self, ProxyError};
use crate::forward;
use crate::lineio::read_line_bounded;
use crate::request::{parse_request_line, ParsedRequest};
use crate::stream;

/// Entry point spawned per accepted socket.
pub async fn handle_connection(mut client: TcpStream, cache: Arc<Cache>) {
    let peer = client
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    if let Err(e) = serve(&mut client, &cache).await {
        // Mid-stream/write failures are routine on the open internet; parse
        // and connect failures are worth a operator's attention.
        match &e {
            ProxyError::Parse { .. } | ProxyError::UpstreamConnect(_) => {
                warn!("{peer}: {e}");
            }
            ProxyError::UpstreamStream(_) | ProxyError::ClientWrite(_) => {
                debug!("{peer}: {e}");
            }
        }
        if e.owes_error_page() {
            if let Err(write_err) = error::respond_with(&mut client, &peer, &e).await {
                debug!("{peer}: failed to deliver error page: {write_err}");
            }
        }
    }
}

async fn serve(client: &mut TcpStream, cache: &Cache) -> Result<(), ProxyError> {
    let (req, headers) = match read_request(client).await? {
        Some(parsed) => parsed,
        None => return Ok(()), // client disconnected before sending a request
    };
    debug!("request: {}:{}{}", req.host, req.port, req.path);

    if let Some(entry) = cache.find(&req.host, &req.path) {
        debug!("cache hit for {}{}", req.host, req.path);
        client
            .write_all(&entry.data)
            .await
            .map_err(ProxyError::ClientWrite)?;
        client.flush().await.map_err(ProxyError::ClientWrite)?;
        return Ok(());
    }
    debug!("cache miss for {}{}", req.host, req.path);

    let mut upstream = TcpStream::connect((req.host.as_str(), req.port))
        .await
        .map_err(ProxyError::UpstreamConnect)?;

    forward::forward_request(&mut upstream, &req, &headers)
        .await
        .map_err(ProxyError::UpstreamStream)?;

    stream::stream_response(&mut upstream, client, &req.host, &req.path, cache).await
}

/// Reads the request line and headers. Returns `Ok(None)` if the client
/// closed the connection before sending anything — not a taxonomy error,
/// just nothing to do.
async fn read_request(
    client: &mut TcpStream,
) -> Result<Option<(ParsedRequest, Vec<String>)>, ProxyError> {
    let mut reader = BufReader::new(&mut *client);

    let line = match read_line_bounded(&mut reader).await {
        Ok(Some(line)) => line,
        Ok(None) => return Ok(None),
        Err(_) => {
            return Err(ProxyError::Parse {
                short: "Parser Error",
                long: "Request line too long.",
            })
        }
    };

    let req = parse_request_line(&line)?;
    let headers = forward::read_client_headers(&mut reader)
        .await
        .map_err(|_| ProxyError::Parse {
            short: "Parser Error",
            long: "Request headers too long.",
        })?;

    Ok(Some((req, headers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn serves_from_cache_without_contacting_upstream() {
        let cache = Arc::new(Cache::new());
        cache.insert(
            "example.com".into(),
            "/cached".into(),
            b"HTTP/1.0 200 OK\r\n\r\ncached body".to_vec(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpStream::connect(addr).await.unwrap();
            conn.write_all(b"GET http://example.com/cached HTTP/1.0\r\n\r\n")
                .await
                .unwrap();
            conn.shutdown().await.unwrap();
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut conn, &mut out)
                .await
                .unwrap();
            out
        });

        let (socket, _) = listener.accept().await.unwrap();
        handle_connection(socket, cache).await;

        let received = client_task.await.unwrap();
        assert_eq!(received, b"HTTP/1.0 200 OK\r\n\r\ncached body");
    }

    #[tokio::test]
    async fn fetches_from_upstream_and_populates_cache_on_miss() {
        let cache = Arc::new(Cache::new());

        let upstream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream_listener.local_addr().unwrap();
        let upstream_task = tokio::spawn(async move {
            let (mut sock, _) = upstream_listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut sock, &mut buf).await.unwrap();
            sock.write_all(b"HTTP/1.0 200 OK\r\nContent-length: 2\r\n\r\nhi")
                .await
                .unwrap();
        });

        let proxy_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = proxy_listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpStream::connect(proxy_addr).await.unwrap();
            let req = format!(
                "GET http://127.0.0.1:{}/hi HTTP/1.0\r\n\r\n",
                upstream_addr.port()
            );
            conn.write_all(req.as_bytes()).await.unwrap();
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut conn, &mut out)
                .await
                .unwrap();
            out
        });

        let (socket, _) = proxy_listener.accept().await.unwrap();
        handle_connection(socket, cache.clone()).await;

        upstream_task.await.unwrap();
        let received = client_task.await.unwrap();
        assert_eq!(received, b"HTTP/1.0 200 OK\r\nContent-length: 2\r\n\r\nhi");

        let cached = cache.find("127.0.0.1", "/hi").unwrap();
        assert_eq!(&*cached.data, received.as_slice());
    }

    #[tokio::test]
    async fn malformed_request_gets_a_404_page() {
        let cache = Arc::new(Cache::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpStream::connect(addr).await.unwrap();
            conn.write_all(b"POST http://example.com/ HTTP/1.0\r\n\r\n")
                .await
                .unwrap();
            conn.shutdown().await.unwrap();
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut conn, &mut out)
                .await
                .unwrap();
            out
        });

        let (socket, _) = listener.accept().await.unwrap();
        handle_connection(socket, cache).await;

        let received = client_task.await.unwrap();
        let text = String::from_utf8_lossy(&received);
        assert!(text.starts_with("HTTP/1.0 404"));
        assert!(text.contains("Invalid command or malformed http://"));
    }

    #[tokio::test]
    async fn oversized_request_line_gets_a_404_page_instead_of_unbounded_buffering() {
        let cache = Arc::new(Cache::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpStream::connect(addr).await.unwrap();
            let mut oversized = b"GET http://example.com/".to_vec();
            oversized.extend(std::iter::repeat(b'a').take(crate::config::MAXLINE + 1024));
            conn.write_all(&oversized).await.unwrap();
            conn.shutdown().await.unwrap();
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut conn, &mut out)
                .await
                .unwrap();
            out
        });

        let (socket, _) = listener.accept().await.unwrap();
        handle_connection(socket, cache).await;

        let received = client_task.await.unwrap();
        let text = String::from_utf8_lossy(&received);
        assert!(text.starts_with("HTTP/1.0 404"));
        assert!(text.contains("Request line too long."));
    }
}
