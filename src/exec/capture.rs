// src/exec/capture.rs

//! Line-oriented output capture shared by both runners.
//!
//! Output is read one line at a time so that it can be streamed to a log
//! sink while the process is still running. Lines are normalized to `\n`
//! endings before they are stored or logged.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, AsyncRead};
use tracing::warn;

use crate::sink::SinkHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Accumulated output of one process.
#[derive(Debug)]
pub struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    merge: bool,
    tail: VecDeque<String>,
    tail_lines: usize,
}

impl Capture {
    pub fn new(merge: bool, tail_lines: usize) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            merge,
            tail: VecDeque::with_capacity(tail_lines),
            tail_lines,
        }
    }

    pub fn push_line(&mut self, stream: Stream, line: &[u8]) {
        let target = match (stream, self.merge) {
            (Stream::Stderr, false) => &mut self.stderr,
            _ => &mut self.stdout,
        };
        target.extend_from_slice(line);

        if self.tail_lines == 0 {
            return;
        }
        if self.tail.len() == self.tail_lines {
            self.tail.pop_front();
        }
        let text = String::from_utf8_lossy(line);
        self.tail.push_back(text.trim_end_matches('\n').to_string());
    }

    /// Last captured lines across both streams, oldest first.
    pub fn tail(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.stdout, self.stderr)
    }
}

/// Turn a raw line (as returned by `read_until(b'\n')`) into its stored form.
///
/// `\r\n` becomes `\n`; a final line without a newline is kept unterminated.
pub fn normalize_line(raw: &[u8]) -> Vec<u8> {
    match raw {
        [head @ .., b'\r', b'\n'] => {
            let mut out = head.to_vec();
            out.push(b'\n');
            out
        }
        _ => raw.to_vec(),
    }
}

fn record(capture: &Mutex<Capture>, sink: Option<&SinkHandle>, stream: Stream, raw: &[u8]) {
    let line = normalize_line(raw);

    if let Some(sink) = sink {
        if let Err(e) = sink.append(&line) {
            warn!(sink = sink.name(), error = %e, "failed to append output to log sink");
        }
    }

    match capture.lock() {
        Ok(mut guard) => guard.push_line(stream, &line),
        Err(poisoned) => poisoned.into_inner().push_line(stream, &line),
    }
}

/// Blocking pump: read `reader` to EOF, recording every line.
pub fn pump_blocking<R: Read>(
    reader: R,
    stream: Stream,
    capture: &Mutex<Capture>,
    sink: Option<&SinkHandle>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        record(capture, sink, stream, &buf);
    }
}

/// Async pump: same as [`pump_blocking`] on a tokio reader.
pub async fn pump_async<R: AsyncRead + Unpin>(
    reader: R,
    stream: Stream,
    capture: &Mutex<Capture>,
    sink: Option<&SinkHandle>,
) -> std::io::Result<()> {
    let mut reader = tokio::io::BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        record(capture, sink, stream, &buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(normalize_line(b"done\r\n"), b"done\n");
        assert_eq!(normalize_line(b"done\n"), b"done\n");
        assert_eq!(normalize_line(b"no newline"), b"no newline");
        assert_eq!(normalize_line(b"\r"), b"\r");
    }

    #[test]
    fn tail_keeps_only_the_last_lines() {
        let mut cap = Capture::new(false, 2);
        cap.push_line(Stream::Stdout, b"one\n");
        cap.push_line(Stream::Stderr, b"two\n");
        cap.push_line(Stream::Stdout, b"three\n");

        assert_eq!(cap.tail(), vec!["two", "three"]);
        let (out, err) = cap.into_parts();
        assert_eq!(out, b"one\nthree\n");
        assert_eq!(err, b"two\n");
    }

    #[test]
    fn merged_capture_puts_stderr_in_stdout() {
        let mut cap = Capture::new(true, 4);
        cap.push_line(Stream::Stdout, b"a\n");
        cap.push_line(Stream::Stderr, b"b\n");
        let (out, err) = cap.into_parts();
        assert_eq!(out, b"a\nb\n");
        assert!(err.is_empty());
    }

    #[test]
    fn blocking_pump_reads_every_line() {
        let cap = Mutex::new(Capture::new(false, 8));
        pump_blocking(&b"x\r\ny\nz"[..], Stream::Stdout, &cap, None).unwrap();
        let (out, _) = cap.into_inner().unwrap().into_parts();
        assert_eq!(out, b"x\ny\nz");
    }
}
