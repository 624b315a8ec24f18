//! Directional packet log.
//!
//! Every hop of a relayed MCP exchange is written to the operator console
//! as one record:
//!
//! ```text
//! [2026-01-31 12:00:00] C→B  Upstream → Proxy
//! data: {"jsonrpc":"2.0","id":1,"result":{}}
//!
//! ```
//!
//! Records are human-readable, not a machine contract, but the direction
//! labels and the truncation marker are stable so they can be grepped.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::observability::truncate::truncate_for_log;

/// ANSI colour applied to every line of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Cyan,
    Green,
    Yellow,
    Magenta,
    Red,
}

impl Color {
    const RESET: &'static str = "\x1b[0m";

    /// Escape sequence that starts this colour.
    pub fn code(self) -> &'static str {
        match self {
            Color::Cyan => "\x1b[36m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Magenta => "\x1b[35m",
            Color::Red => "\x1b[31m",
        }
    }
}

/// The hop a record describes.
///
/// A is the client, B this proxy, C the upstream server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToProxy,
    ProxyToUpstream,
    UpstreamToProxy,
    ProxyToClient,
    Error,
}

impl Direction {
    /// Header label, e.g. `A→B  Client → Proxy`.
    pub fn label(self) -> &'static str {
        match self {
            Direction::ClientToProxy => "A→B  Client → Proxy",
            Direction::ProxyToUpstream => "B→C  Proxy → Upstream",
            Direction::UpstreamToProxy => "C→B  Upstream → Proxy",
            Direction::ProxyToClient => "B→A  Proxy → Client",
            Direction::Error => "ERROR",
        }
    }

    /// Colour used for this hop.
    pub fn color(self) -> Color {
        match self {
            Direction::ClientToProxy => Color::Green,
            Direction::ProxyToUpstream => Color::Magenta,
            Direction::UpstreamToProxy => Color::Yellow,
            Direction::ProxyToClient => Color::Cyan,
            Direction::Error => Color::Red,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type Sink = Box<dyn Write + Send>;

/// Serialized writer of packet records.
///
/// Cheap to clone; all clones share one sink and one lock, so records from
/// concurrent relays never interleave.
#[derive(Clone)]
pub struct PacketLogger {
    sink: Arc<Mutex<Sink>>,
    color: bool,
    pretty_json: bool,
}

impl PacketLogger {
    /// Logger writing to an arbitrary sink.
    pub fn new<W>(sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
            color: true,
            pretty_json: false,
        }
    }

    /// Logger writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Enable or disable ANSI colour sequences.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Pretty-print complete JSON bodies in [`PacketLogger::log_body`].
    pub fn with_pretty_json(mut self, pretty_json: bool) -> Self {
        self.pretty_json = pretty_json;
        self
    }

    /// Log a known-complete request body.
    ///
    /// Still passes through the truncation rule; JSON bodies short-circuit
    /// to full output there. Parse failures fall back to the raw text.
    pub fn log_body(&self, direction: Direction, body: &[u8]) {
        let text = String::from_utf8_lossy(body);
        let rendered = if self.pretty_json {
            pretty_json(&text).map(Cow::Owned).unwrap_or(text)
        } else {
            text
        };
        self.emit(direction, &truncate_for_log(&rendered));
    }

    /// Log one streamed chunk, applying the truncation rule.
    pub fn log_chunk(&self, direction: Direction, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        self.emit(direction, &truncate_for_log(&text));
    }

    /// Log a diagnostic message under the `ERROR` label.
    pub fn log_error(&self, message: &str) {
        self.emit(Direction::Error, message);
    }

    /// Write one record verbatim.
    pub fn emit(&self, direction: Direction, payload: &str) {
        let record = self.render(direction, payload);

        // A poisoned lock only means another writer panicked mid-record.
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = sink.write_all(record.as_bytes()).and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write packet log record");
        }
    }

    fn render(&self, direction: Direction, payload: &str) -> String {
        let (start, reset) = if self.color {
            (direction.color().code(), Color::RESET)
        } else {
            ("", "")
        };
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

        let mut record = String::with_capacity(payload.len() + 64);
        record.push_str(&format!("{start}[{timestamp}] {direction}{reset}\n"));
        for line in payload.split('\n') {
            record.push_str(&format!("{start}{line}{reset}\n"));
        }
        record.push('\n');
        record
    }
}

impl fmt::Debug for PacketLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketLogger")
            .field("color", &self.color)
            .field("pretty_json", &self.pretty_json)
            .finish_non_exhaustive()
    }
}

fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// In-memory sink shared between a logger and the code inspecting it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buf = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Number of records whose header carries `direction`'s label.
    pub fn count_records(&self, direction: Direction) -> usize {
        let suffix = format!("] {}", direction.label());
        self.contents()
            .lines()
            .filter(|line| {
                let line = line.strip_suffix(Color::RESET).unwrap_or(line);
                line.contains("[") && line.ends_with(&suffix)
            })
            .count()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
