//! Byte-level encoding report for extracted text.
//!
//! Shown by `contentgen inspect` so users can see why a document came out
//! garbled before spending tokens on it.

use serde::Serialize;
use std::fmt;

/// Bytes shown in the hex/binary/ASCII previews.
const PREVIEW_BYTES: usize = 20;
/// Bytes scanned for the encoding hints.
const SCAN_BYTES: usize = 100;

/// Views of the leading bytes plus simple encoding hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingReport {
    pub hex: String,
    pub binary: String,
    /// Printable ASCII, `.` for everything else.
    pub ascii: String,
    /// Some byte in the scan window has its high bit set.
    pub utf8_candidate: bool,
    /// Every byte in the scan window is below 128.
    pub ascii_only: bool,
    /// The scan window contains a NUL byte.
    pub utf16_candidate: bool,
    /// The whole buffer decodes as UTF-8.
    pub valid_utf8: bool,
    pub total_bytes: usize,
}

impl EncodingReport {
    pub fn analyze(bytes: &[u8]) -> Self {
        let preview = &bytes[..bytes.len().min(PREVIEW_BYTES)];
        let scan = &bytes[..bytes.len().min(SCAN_BYTES)];

        Self {
            hex: preview
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" "),
            binary: preview
                .iter()
                .map(|b| format!("{b:08b}"))
                .collect::<Vec<_>>()
                .join(" "),
            ascii: preview
                .iter()
                .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
                .collect(),
            utf8_candidate: scan.iter().any(|b| b & 0x80 != 0),
            ascii_only: scan.iter().all(|&b| b < 128),
            utf16_candidate: scan.contains(&0),
            valid_utf8: std::str::from_utf8(bytes).is_ok(),
            total_bytes: bytes.len(),
        }
    }
}

impl fmt::Display for EncodingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |b: bool| if b { "yes" } else { "no" };
        writeln!(f, "First {} bytes:", PREVIEW_BYTES.min(self.total_bytes))?;
        writeln!(f, "  hex    {}", self.hex)?;
        writeln!(f, "  binary {}", self.binary)?;
        writeln!(f, "  ascii  {}", self.ascii)?;
        writeln!(f, "Patterns in the first {} bytes:", SCAN_BYTES.min(self.total_bytes))?;
        writeln!(f, "  UTF-8 (high bit set)  {}", mark(self.utf8_candidate))?;
        writeln!(f, "  ASCII (all < 128)     {}", mark(self.ascii_only))?;
        writeln!(f, "  UTF-16 (NUL bytes)    {}", mark(self.utf16_candidate))?;
        write!(f, "Valid UTF-8 overall: {}", mark(self.valid_utf8))
    }
}
