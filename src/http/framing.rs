//! Line framing for upstream response bodies.
//!
//! The upstream transport hands over arbitrary byte chunks. The relay
//! forwards and logs one `\n`-terminated line at a time, which matches SSE
//! framing and keeps each packet record aligned with an event line.
//!
//! A partial line is never held back indefinitely: once `MAX_PENDING` bytes
//! accumulate without a newline they are released verbatim, and the relay
//! releases a shorter partial via [`LineFramer::take_partial`] whenever the
//! upstream has nothing more ready.

use bytes::{Bytes, BytesMut};

/// Most bytes buffered without a newline before they are released as-is.
pub const MAX_PENDING: usize = 64 * 1024;

/// Incremental splitter of a byte stream into `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    /// Prefix of `buf` already known to contain no newline.
    scanned: usize,
    /// A partial line was released and its newline has not been seen yet.
    open_line: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete line, newline included.
    ///
    /// With no newline buffered but at least `MAX_PENDING` bytes pending,
    /// the pending bytes are returned unterminated instead.
    pub fn next_line(&mut self) -> Option<Bytes> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset + 1;
                self.scanned = 0;
                self.open_line = false;
                Some(self.buf.split_to(end).freeze())
            }
            None if self.buf.len() >= MAX_PENDING => self.take_partial(),
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Release every buffered byte verbatim, without adding a newline.
    pub fn take_partial(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            return None;
        }
        self.scanned = 0;
        self.open_line = true;
        Some(self.buf.split().freeze())
    }

    /// Terminate the stream, closing an unfinished last line with `\n`.
    ///
    /// Buffered bytes are returned with the newline appended. If the line was
    /// already released in pieces, only the newline is returned.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() && !self.open_line {
            return None;
        }
        self.scanned = 0;
        self.open_line = false;
        let mut rest = self.buf.split();
        rest.extend_from_slice(b"\n");
        Some(rest.freeze())
    }

    /// Bytes buffered but not yet returned.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
