//! Error taxonomy (spec §7) and the HTML error responder (component G).

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Distinguishes the handful of failure classes the connection handler cares
/// about, so it can decide whether the client is still owed an HTML error
/// page or whether the connection must simply be dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Client-request malformed (spec §7 case 1). Carries the short/long
    /// messages already in the vocabulary the original parser used.
    #[error("{short}: {long}")]
    Parse { short: &'static str, long: &'static str },

    /// Could not open a TCP connection to the origin (case 2).
    #[error("error opening connection to server: {0}")]
    UpstreamConnect(#[source] std::io::Error),

    /// Origin connection failed mid-stream: short read, reset, or idle
    /// timeout (case 3). Never reported to the client; earlier bytes may
    /// already be on the wire.
    #[error("upstream stream error: {0}")]
    UpstreamStream(#[source] std::io::Error),

    /// Write to the client socket failed (case 4): broken pipe, reset, etc.
    #[error("client write error: {0}")]
    ClientWrite(#[source] std::io::Error),
}

impl ProxyError {
    /// True for the classes that still owe the client an HTML error page
    /// (cases 1-2). False for mid-stream/write failures, where bytes may
    /// already have been sent and an error page would corrupt the response.
    pub fn owes_error_page(&self) -> bool {
        matches!(self, ProxyError::Parse { .. } | ProxyError::UpstreamConnect(_))
    }

    pub fn errnum(&self) -> &'static str {
        "404"
    }

    pub fn shortmsg(&self) -> &'static str {
        match self {
            ProxyError::Parse { short, .. } => short,
            ProxyError::UpstreamConnect(_) => "Server Connection Error",
            _ => "Error",
        }
    }

    pub fn longmsg(&self) -> String {
        match self {
            ProxyError::Parse { long, .. } => long.to_string(),
            ProxyError::UpstreamConnect(_) => "Error opening connection to server.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Renders and writes a minimal HTML 4xx page to the client (component G).
///
/// Never call this after any byte of a real upstream response has reached
/// the client — callers are responsible for that ordering guarantee.
pub async fn client_error(
    stream: &mut TcpStream,
    cause: &str,
    errnum: &str,
    shortmsg: &str,
    longmsg: &str,
) -> std::io::Result<()> {
    let body = format!(
        "<html><title>Proxy Error</title><body bgcolor=\"ffffff\">\r\n\
         {errnum}: {shortmsg}\r\n\
         <p>{longmsg}: {cause}\r\n\
         <hr><em>The Rust Proxy</em>\r\n"
    );

    let mut response = format!("HTTP/1.0 {errnum} {shortmsg}\r\n");
    response.push_str("Content-type: text/html\r\n");
    response.push_str(&format!("Content-length: {}\r\n\r\n", body.len()));
    response.push_str(&body);

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// Convenience: render the page for a [`ProxyError`] that [`owes_error_page`](ProxyError::owes_error_page).
pub async fn respond_with(stream: &mut TcpStream, cause: &str, err: &ProxyError) -> std::io::Result<()> {
    client_error(stream, cause, err.errnum(), err.shortmsg(), &err.longmsg()).await
}
