//! Module wiring and the server's async entry point.

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod forward;
pub mod lineio;
pub mod request;
pub mod stream;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::net::TcpListener;
use tokio::signal;

use cache::Cache;
use config::SHUTDOWN_GRACE_PERIOD;

/// Ignores `SIGPIPE` so that writing to a client socket that has already
/// closed surfaces as an `Err` from the write call instead of killing the
/// process, matching the original's `Signal(SIGPIPE, SIG_IGN)` at startup.
fn ignore_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Binds `port` on all interfaces and runs the accept loop until a shutdown
/// signal arrives, then waits up to [`SHUTDOWN_GRACE_PERIOD`] for in-flight
/// connections to finish before returning.
pub async fn run_server(port: u16) -> anyhow::Result<()> {
    ignore_sigpipe();

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on 0.0.0.0:{port}");
    warn!("HTTPS requests are forwarded as plaintext to the named host/port; no TLS tunneling is provided");

    let cache = Arc::new(Cache::new());
    let in_flight = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let _ = stream.set_nodelay(true);
                let cache = cache.clone();
                let in_flight = in_flight.clone();
                in_flight.fetch_add(1, Ordering::Relaxed);
                log::debug!("accepted connection from {peer}");
                tokio::spawn(async move {
                    connection::handle_connection(stream, cache).await;
                    in_flight.fetch_sub(1, Ordering::Relaxed);
                });
            }
            _ = shutdown_signal() => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE_PERIOD;
    while in_flight.load(Ordering::Relaxed) > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let remaining = in_flight.load(Ordering::Relaxed);
    if remaining > 0 {
        warn!("shutting down with {remaining} connection(s) still in flight");
    } else {
        info!("shutdown complete");
    }

    Ok(())
}
