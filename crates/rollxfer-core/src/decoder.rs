//! Decoder for the upload script's stdout.
//!
//! The script prints free-form text. Two line shapes carry meaning:
//!
//! ```text
//! TOTAL_FILES=<n>
//! ⬆️ Uploading <source> → <destination>
//! ```
//!
//! Output arrives in arbitrary chunks, so a record can be split anywhere,
//! including inside a multi-byte character. Only complete lines are decoded.

use serde::Serialize;

const TOTAL_PREFIX: &str = "TOTAL_FILES=";
const UPLOAD_GLYPH: char = '\u{2B06}';
const VARIATION_SELECTOR: char = '\u{FE0F}';
const UPLOADING: &str = "Uploading ";
const ARROW: &str = " → ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    TotalDeclared { count: u64 },
    FileUploaded { source: String, destination: String },
}

#[derive(Debug, Default)]
pub struct ProgressStreamDecoder {
    pending: Vec<u8>,
    exited: bool,
    ignored_lines: u64,
}

impl ProgressStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and decode every line it completes. A trailing partial
    /// line stays buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut consumed = 0usize;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            if let Some(event) = self.decode_line(consumed, end) {
                events.push(event);
            }
            consumed = end + 1;
        }
        self.pending.drain(..consumed);
        events
    }

    /// The command has exited: decode the unterminated tail, if any, and
    /// mark the stream complete.
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        self.exited = true;
        if self.pending.is_empty() {
            return Vec::new();
        }
        let end = self.pending.len();
        let event = self.decode_line(0, end);
        self.pending.clear();
        event.into_iter().collect()
    }

    /// True once `finish` has run and nothing is left buffered.
    pub fn is_complete(&self) -> bool {
        self.exited && self.pending.is_empty()
    }

    /// Bytes of the current partial line.
    pub fn buffered(&self) -> &[u8] {
        &self.pending
    }

    /// Complete, non-blank lines that matched neither record shape.
    pub fn ignored_lines(&self) -> u64 {
        self.ignored_lines
    }

    fn decode_line(&mut self, start: usize, end: usize) -> Option<ProgressEvent> {
        let raw = String::from_utf8_lossy(&self.pending[start..end]);
        let line: String = raw.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect();
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let event = parse_line(line);
        if event.is_none() {
            self.ignored_lines += 1;
            log::trace!("ignoring script output: {}", line);
        }
        event
    }
}

/// Classify one complete, trimmed line.
pub fn parse_line(line: &str) -> Option<ProgressEvent> {
    if let Some(count) = line.strip_prefix(TOTAL_PREFIX) {
        if !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) {
            return count
                .parse()
                .ok()
                .map(|count| ProgressEvent::TotalDeclared { count });
        }
        return None;
    }

    let rest = line.strip_prefix(UPLOAD_GLYPH)?;
    let rest = rest.strip_prefix(VARIATION_SELECTOR).unwrap_or(rest);
    let rest = rest.strip_prefix(' ')?.strip_prefix(UPLOADING)?;
    let (source, destination) = rest.rsplit_once(ARROW)?;
    if source.is_empty() || destination.is_empty() {
        return None;
    }
    Some(ProgressEvent::FileUploaded {
        source: source.to_owned(),
        destination: destination.to_owned(),
    })
}
