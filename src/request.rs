//! Absolute-URI `GET` request-line parser (component B).
//!
//! Ported from the byte-by-byte walk in the original `parse_get_request`,
//! operating on `&str`/`&[u8]` instead of raw pointers and returning a typed
//! [`ProxyError`] instead of writing an HTML page mid-parse.

use crate::config::DEFAULT_HTTP_PORT;
use crate::error::ProxyError;

/// The three pieces of an absolute-URI `GET` request the proxy needs:
/// where to connect, and what to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub host: String,
    pub port: u16,
    pub path: String,
}

fn parse_error(long: &'static str) -> ProxyError {
    ProxyError::Parse {
        short: "Parser Error",
        long,
    }
}

/// Parses a single CRLF-terminated request line. `line` may still carry its
/// trailing `\r\n`; it is trimmed here.
pub fn parse_request_line(line: &str) -> Result<ParsedRequest, ProxyError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let rest = if let Some(r) = line.strip_prefix("GET http://") {
        r
    } else if let Some(r) = line.strip_prefix("GET https://") {
        r
    } else {
        return Err(parse_error("Invalid command or malformed http://"));
    };

    let bytes = rest.as_bytes();
    let mut i = 0usize;

    // host := 1*(byte minus ':' '/' ' ')
    while i < bytes.len() && !matches!(bytes[i], b':' | b'/' | b' ') {
        i += 1;
    }
    let host = &rest[..i];
    if host.is_empty() {
        return Err(parse_error("Server name is empty."));
    }
    if i == bytes.len() {
        return Err(parse_error("Missing HTTP/1.x request."));
    }
    let host = host.to_string();

    // optional ":" port
    let port = if bytes[i] == b':' {
        i += 1;
        let port_start = i;
        while i < bytes.len() && bytes[i] != b'/' && bytes[i] != b' ' {
            if !bytes[i].is_ascii_digit() {
                return Err(parse_error("Non-numeric character in port."));
            }
            i += 1;
        }
        if i == port_start {
            return Err(parse_error("No port specified after :"));
        }
        if i == bytes.len() {
            return Err(parse_error("Missing HTTP/1.x"));
        }
        // atoi-style parse; an out-of-u16-range port is clamped rather than
        // rejected outright (the spec and original both only define
        // "non-numeric", not "too large").
        rest[port_start..i]
            .parse::<u32>()
            .map(|p| p.min(u16::MAX as u32) as u16)
            .unwrap_or(DEFAULT_HTTP_PORT)
    } else {
        DEFAULT_HTTP_PORT
    };

    // optional path, defaulting to "/"
    let path = if i < bytes.len() && bytes[i] == b'/' {
        let path_start = i;
        while i < bytes.len() && bytes[i] != b' ' {
            i += 1;
        }
        rest[path_start..i].to_string()
    } else {
        "/".to_string()
    };

    Ok(ParsedRequest { host, port, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_only() {
        let p = parse_request_line("GET http://example.com HTTP/1.0\r\n").unwrap();
        assert_eq!(p.host, "example.com");
        assert_eq!(p.port, 80);
        assert_eq!(p.path, "/");
    }

    #[test]
    fn parses_host_port_path() {
        let p = parse_request_line("GET http://example.com:8080/a HTTP/1.0\r\n").unwrap();
        assert_eq!(p.host, "example.com");
        assert_eq!(p.port, 8080);
        assert_eq!(p.path, "/a");
    }

    #[test]
    fn parses_https_as_plaintext() {
        let p = parse_request_line("GET https://example.com/ HTTP/1.0\r\n").unwrap();
        assert_eq!(p.host, "example.com");
        assert_eq!(p.port, 80);
        assert_eq!(p.path, "/");
    }

    #[test]
    fn defaults_missing_path_to_slash() {
        let p = parse_request_line("GET http://example.com HTTP/1.0\r\n").unwrap();
        assert_eq!(p.path, "/");
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = parse_request_line("POST http://example.com/ HTTP/1.0\r\n").unwrap_err();
        assert_eq!(err.longmsg(), "Invalid command or malformed http://");
    }

    #[test]
    fn rejects_empty_host() {
        let err = parse_request_line("GET http:// HTTP/1.0\r\n").unwrap_err();
        assert_eq!(err.longmsg(), "Server name is empty.");
    }

    #[test]
    fn rejects_missing_http_tag() {
        let err = parse_request_line("GET http://example.com").unwrap_err();
        assert_eq!(err.longmsg(), "Missing HTTP/1.x request.");
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = parse_request_line("GET http://example.com:8a/ HTTP/1.0\r\n").unwrap_err();
        assert_eq!(err.longmsg(), "Non-numeric character in port.");
    }

    #[test]
    fn rejects_empty_port() {
        let err = parse_request_line("GET http://example.com:/ HTTP/1.0\r\n").unwrap_err();
        assert_eq!(err.longmsg(), "No port specified after :");
    }

    #[test]
    fn preserves_query_string_in_path_verbatim() {
        let p = parse_request_line("GET http://example.com/a?b=c HTTP/1.0\r\n").unwrap();
        assert_eq!(p.path, "/a?b=c");
    }
}
