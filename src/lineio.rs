//! Line-buffered socket reader (component A).
//!
//! A thin wrapper around [`tokio::io::AsyncBufRead`] that caps how much a
//! single line may grow before a terminator shows up. Plain
//! `AsyncBufReadExt::read_line` has no such cap: a client that never sends a
//! `\n` would otherwise let the accumulator grow without bound. This mirrors
//! the original's `MAXLINE`-sized stack buffer without the original's fixed
//! capacity — lines are heap-allocated but rejected past [`MAXLINE`].

use tokio::io::AsyncBufRead;

use crate::config::MAXLINE;

/// Reads one line (including its terminator, if any) from `reader`, lossily
/// decoding non-UTF-8 bytes rather than failing on them — header values are
/// expected to be ASCII, but a stray byte shouldn't be fatal to the line.
///
/// Returns `Ok(None)` on EOF with nothing read. Returns an error if the line
/// grows past `MAXLINE` bytes without a terminator.
pub async fn read_line_bounded<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Option<String>> {
    use tokio::io::AsyncBufReadExt;

    let mut out: Vec<u8> = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            out.extend_from_slice(&available[..=pos]);
            reader.consume(pos + 1);
            break;
        }
        out.extend_from_slice(available);
        let consumed = available.len();
        reader.consume(consumed);
        if out.len() > MAXLINE {
            return Err(too_long());
        }
    }

    if out.is_empty() {
        return Ok(None);
    }
    if out.len() > MAXLINE {
        return Err(too_long());
    }
    Ok(Some(String::from_utf8_lossy(&out).into_owned()))
}

fn too_long() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, "line exceeds MAXLINE")
}
