// src/scan.rs

//! Incremental scanning of worker stdout for the progress line.
//!
//! Grammar, applied per line (`\n`-terminated, trailing `\r` ignored):
//!
//! ```text
//! progress-line := <any text> "Generated image:" <ws>* <path> <ws>*
//! ```
//!
//! The first progress line with a non-empty path produces the session's only
//! [`ProgressEvent`]. A marker with nothing after it is logged and skipped.
//! Lines are reassembled across chunk boundaries, so a marker or path split
//! between two reads is still seen whole. A final line without a newline is
//! scanned by [`OutputScanner::finish`].

use tracing::{debug, warn};

use crate::events::ProgressEvent;
use crate::session::SessionId;

pub const PROGRESS_MARKER: &str = "Generated image:";

/// Result of matching one line against the progress grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLine<'a> {
    NotProgress,
    Path(&'a str),
    MissingPath,
}

pub fn parse_progress_line(line: &str) -> ProgressLine<'_> {
    match line.find(PROGRESS_MARKER) {
        None => ProgressLine::NotProgress,
        Some(idx) => {
            let path = line[idx + PROGRESS_MARKER.len()..].trim();
            if path.is_empty() {
                ProgressLine::MissingPath
            } else {
                ProgressLine::Path(path)
            }
        }
    }
}

/// Accumulates a session's stdout and watches it for the progress line.
#[derive(Debug)]
pub struct OutputScanner {
    session: SessionId,
    stdout: Vec<u8>,
    partial: Vec<u8>,
    emitted: bool,
}

impl OutputScanner {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            stdout: Vec::new(),
            partial: Vec::new(),
            emitted: false,
        }
    }

    /// Feed the next stdout chunk. The chunk is kept verbatim; the returned
    /// event, if any, is the session's single progress event.
    pub fn push(&mut self, chunk: &[u8]) -> Option<ProgressEvent> {
        self.stdout.extend_from_slice(chunk);
        if self.emitted {
            return None;
        }

        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let line = std::mem::take(&mut self.partial);
            if let Some(event) = self.scan_line(&line) {
                return Some(event);
            }
        }
        self.partial.extend_from_slice(rest);
        None
    }

    /// Scan whatever is left after the stream closed.
    pub fn finish(&mut self) -> Option<ProgressEvent> {
        if self.emitted || self.partial.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.partial);
        self.scan_line(&line)
    }

    fn scan_line(&mut self, line: &[u8]) -> Option<ProgressEvent> {
        let text = String::from_utf8_lossy(line);
        debug!(session = %self.session, "stdout: {}", text.trim_end());

        match parse_progress_line(&text) {
            ProgressLine::NotProgress => None,
            ProgressLine::MissingPath => {
                warn!(
                    session = %self.session,
                    line = %text.trim_end(),
                    "progress marker without a path; ignoring"
                );
                None
            }
            ProgressLine::Path(path) => {
                self.emitted = true;
                self.partial.clear();
                Some(ProgressEvent {
                    session: self.session,
                    path: path.to_string(),
                })
            }
        }
    }

    pub fn progress_emitted(&self) -> bool {
        self.emitted
    }

    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> OutputScanner {
        OutputScanner::new(SessionId::from_raw(7))
    }

    #[test]
    fn grammar_extracts_trimmed_path() {
        assert_eq!(
            parse_progress_line("Generated image:   /tmp/a.png \r"),
            ProgressLine::Path("/tmp/a.png")
        );
        assert_eq!(
            parse_progress_line("INFO Generated image: /x.png"),
            ProgressLine::Path("/x.png")
        );
        assert_eq!(parse_progress_line("Generated image:  "), ProgressLine::MissingPath);
        assert_eq!(parse_progress_line("plotting hole 1"), ProgressLine::NotProgress);
    }

    #[test]
    fn emits_once_for_a_whole_line() {
        let mut s = scanner();
        let ev = s.push(b"Generated image: /tmp/a.png\n").unwrap();
        assert_eq!(ev.path, "/tmp/a.png");
        assert_eq!(ev.session, SessionId::from_raw(7));
        assert!(s.progress_emitted());
    }

    #[test]
    fn waits_for_line_end_before_matching() {
        let mut s = scanner();
        assert_eq!(s.push(b"Generated ima"), None);
        assert_eq!(s.push(b"ge: /tmp/long/pa"), None);
        let ev = s.push(b"th.png\nmore log\n").unwrap();
        assert_eq!(ev.path, "/tmp/long/path.png");
    }

    #[test]
    fn first_marker_wins() {
        let mut s = scanner();
        let ev = s
            .push(b"Generated image: /a.png\nGenerated image: /b.png\n")
            .unwrap();
        assert_eq!(ev.path, "/a.png");
        assert_eq!(s.push(b"Generated image: /c.png\n"), None);
        assert_eq!(s.finish(), None);
    }

    #[test]
    fn marker_without_path_does_not_consume_the_event() {
        let mut s = scanner();
        assert_eq!(s.push(b"Generated image:\n"), None);
        assert!(!s.progress_emitted());
        let ev = s.push(b"Generated image: /later.png\n").unwrap();
        assert_eq!(ev.path, "/later.png");
    }

    #[test]
    fn finish_scans_unterminated_last_line() {
        let mut s = scanner();
        assert_eq!(s.push(b"log\nGenerated image: /tail.png"), None);
        assert_eq!(s.finish().unwrap().path, "/tail.png");
    }

    #[test]
    fn stdout_is_kept_verbatim() {
        let mut s = scanner();
        s.push(b"Generated image: /a.png\r\n");
        s.push(b"[{\"success\":true,");
        s.push(b"\"output_path\":\"/a.png\"}]");
        assert_eq!(
            s.stdout(),
            b"Generated image: /a.png\r\n[{\"success\":true,\"output_path\":\"/a.png\"}]"
        );
    }
}
