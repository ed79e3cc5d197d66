//! Fixed constants governing cache capacity and protocol limits.
//!
//! None of these are runtime-configurable: the spec calls them out as fixed
//! budgets, not tunables, so they live here as plain `const`s rather than a
//! config struct threaded through the call graph.

/// Total byte budget for the cache across all entries.
pub const MAX_CACHE_SIZE: usize = 1_049_000;

/// Per-entry cap; anything the response streamer captures at or above this
/// size is never inserted into the cache.
pub const MAX_OBJECT_SIZE: usize = 102_400;

/// Port used when the client's absolute-URI omits one.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Upper bound on a single request/header line read from the client.
pub const MAXLINE: usize = 8192;

/// How long the response streamer will wait on a single read from the
/// upstream socket before giving up (addresses O5: the original source has
/// no upstream timeout at all).
pub const UPSTREAM_IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Grace period the accept loop waits for in-flight connections to finish
/// after a shutdown signal before the process exits anyway.
pub const SHUTDOWN_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(10);

pub const USER_AGENT_HDR: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";
pub const ACCEPT_HDR: &str =
    "Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n";
pub const ACCEPT_ENCODING_HDR: &str = "Accept-Encoding: gzip, deflate\r\n";
pub const CONNECTION_HDR: &str = "Connection: close\r\n";
pub const PROXY_CONNECTION_HDR: &str = "Proxy-Connection: close\r\n";
