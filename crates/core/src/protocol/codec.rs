//! CRLF line framing (§4.1), grounded on `transport/tcp.rs`'s
//! `read_line`-accumulation loop, adapted to a single-line-per-command
//! protocol instead of blank-line-terminated request blocks.

use std::io::{self, BufRead};

/// Maximum bytes in one line, per `original_source/server/include/server.h`'s
/// `LINE_BUF`.
pub const MAX_LINE: usize = 512;

/// Result of reading one frame from a connection.
pub enum Frame {
    /// A complete line, with the trailing CR/LF already stripped.
    Line(String),
    /// A line exceeded [`MAX_LINE`], or was not valid UTF-8, or the
    /// connection closed mid-line. Treated as one malformed command (§4.1).
    Malformed,
    /// The connection closed cleanly between frames.
    Eof,
}

/// Read one CRLF- (or bare LF-) terminated line from `reader`.
///
/// Driven off `fill_buf`/`consume` instead of a bare `read_until` so the
/// accumulator can never grow past [`MAX_LINE`] + 1 bytes (§4.1) no matter
/// how long a client keeps sending data with no terminator in sight: once
/// the cap is reached, further bytes are still drained from the stream (so
/// the next call resyncs at the real next frame boundary) but are no longer
/// copied into `buf`.
pub fn read_frame(reader: &mut impl BufRead) -> io::Result<Frame> {
    const CAP: usize = MAX_LINE + 1;

    let mut buf = Vec::new();
    let mut found_newline = false;

    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let chunk_len = newline_pos.map_or(available.len(), |pos| pos + 1);

        let room = CAP.saturating_sub(buf.len());
        if room > 0 {
            buf.extend_from_slice(&available[..chunk_len.min(room)]);
        }
        reader.consume(chunk_len);

        if newline_pos.is_some() {
            found_newline = true;
            break;
        }
    }

    if buf.is_empty() && !found_newline {
        return Ok(Frame::Eof);
    }
    if !found_newline || buf.len() > MAX_LINE {
        return Ok(Frame::Malformed);
    }

    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }

    match String::from_utf8(buf) {
        Ok(line) => Ok(Frame::Line(line)),
        Err(_) => Ok(Frame::Malformed),
    }
}
