//! Easy2 handler that buffers one response: header lines and body bytes.

use std::str;

/// Collects a transfer's output. Implements curl's Handler for Easy2.
#[derive(Debug, Default)]
pub struct Collector {
    /// Header lines of the latest response (cleared when a new status line
    /// arrives, so only the final hop of a redirect chain is kept).
    pub(super) header_lines: Vec<String>,
    pub(super) body: Vec<u8>,
}

impl curl::easy::Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.header_lines.clear();
            }
            if !line.is_empty() {
                self.header_lines.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Splits collected lines into `(name, value)` pairs, skipping the status line.
pub(super) fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    lines
        .iter()
        .filter(|line| !line.starts_with("HTTP/"))
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}
