// src/sink.rs

//! Named, append-only log sinks for raw subprocess output.
//!
//! A sink is a file keyed by name. The first writer creates it; every later
//! writer appends. Each `append` is written under the sink's lock as whole
//! lines, so concurrent commands sharing a sink interleave line by line and
//! never mid-line.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use tracing::debug;

use crate::errors::{Result, ShellError};

/// Registry of open sinks. One per [`crate::ShellContext`].
#[derive(Debug)]
pub struct LogSinks {
    dir: PathBuf,
    timestamps: bool,
    open: Mutex<HashMap<String, Arc<Sink>>>,
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

/// Cheap, cloneable handle to one open sink.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    name: String,
    sink: Arc<Sink>,
    timestamps: bool,
}

impl LogSinks {
    pub fn new(dir: impl Into<PathBuf>, timestamps: bool) -> Self {
        Self {
            dir: dir.into(),
            timestamps,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Where a sink name lands on disk.
    ///
    /// Absolute names are used as given; relative ones land under the log
    /// dir.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let p = Path::new(name);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.dir.join(p)
        }
    }

    /// Open (or reuse) the sink called `name`.
    pub fn open(&self, name: &str) -> Result<SinkHandle> {
        if name.trim().is_empty() {
            return Err(ShellError::ConfigError("log sink name must not be empty".into()));
        }
        if Path::new(name).components().any(|c| c == Component::ParentDir) {
            return Err(ShellError::ConfigError(format!(
                "log sink name must not contain '..': {name}"
            )));
        }

        let mut open = self
            .open
            .lock()
            .map_err(|_| anyhow!("log sink registry poisoned"))?;

        if let Some(sink) = open.get(name) {
            return Ok(self.handle(name, sink.clone()));
        }

        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating log dir {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log sink {}", path.display()))?;

        debug!(sink = name, path = %path.display(), "log sink opened");

        let sink = Arc::new(Sink {
            path,
            file: Mutex::new(file),
        });
        open.insert(name.to_string(), sink.clone());
        Ok(self.handle(name, sink))
    }

    /// Append `bytes` to the sink called `name`, opening it if needed.
    pub fn append(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.open(name)?.append(bytes)
    }

    pub fn len(&self) -> usize {
        self.open.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush every sink to disk and forget them.
    ///
    /// Handles still held elsewhere keep their file open until dropped.
    pub fn close_all(&self) -> Result<()> {
        let drained: Vec<(String, Arc<Sink>)> = {
            let mut open = self
                .open
                .lock()
                .map_err(|_| anyhow!("log sink registry poisoned"))?;
            open.drain().collect()
        };

        for (name, sink) in drained {
            let file = sink
                .file
                .lock()
                .map_err(|_| anyhow!("log sink {name} poisoned"))?;
            file.sync_all()
                .with_context(|| format!("syncing log sink {}", sink.path.display()))?;
            debug!(sink = %name, "log sink closed");
        }
        Ok(())
    }

    fn handle(&self, name: &str, sink: Arc<Sink>) -> SinkHandle {
        SinkHandle {
            name: name.to_string(),
            sink,
            timestamps: self.timestamps,
        }
    }
}

impl SinkHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.sink.path
    }

    /// Write `bytes` as one atomic group of lines.
    ///
    /// Data without a trailing newline is terminated with one.
    pub fn append(&self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let buf = frame_lines(bytes, self.timestamps.then(timestamp_prefix).as_deref());

        let mut file = self
            .sink
            .file
            .lock()
            .map_err(|_| anyhow!("log sink {} poisoned", self.name))?;
        file.write_all(&buf)?;
        Ok(())
    }
}

fn timestamp_prefix() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f ")
        .to_string()
}

fn frame_lines(bytes: &[u8], prefix: Option<&str>) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    for line in bytes.split_inclusive(|b| *b == b'\n') {
        if let Some(p) = prefix {
            out.extend_from_slice(p.as_bytes());
        }
        out.extend_from_slice(line);
    }
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn unterminated_data_gets_a_newline() {
        assert_eq!(frame_lines(b"partial", None), b"partial\n");
        assert_eq!(frame_lines(b"a\nb\n", None), b"a\nb\n");
    }

    #[test]
    fn prefix_applies_to_every_line() {
        assert_eq!(frame_lines(b"a\nb", Some("T ")), b"T a\nT b\n");
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = LogSinks::new(dir.path(), false);

        sinks.append("fetch.log", b"one\n").unwrap();
        sinks.append("fetch.log", b"two\n").unwrap();

        assert_eq!(sinks.len(), 1);
        let text = fs::read_to_string(dir.path().join("fetch.log")).unwrap();
        assert_eq!(text, "one\ntwo\n");
    }

    #[test]
    fn nested_names_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = LogSinks::new(dir.path(), false);

        let handle = sinks.open("recipes/glib/fetch.log").unwrap();
        handle.append(b"hello").unwrap();

        assert!(dir.path().join("recipes/glib/fetch.log").is_file());
    }

    #[test]
    fn parent_dir_names_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let logs = root.path().join("logs");
        let sinks = LogSinks::new(&logs, false);

        let err = sinks.open("../escaped.log").unwrap_err();
        assert!(matches!(err, ShellError::ConfigError(_)));
        assert!(sinks.append("recipes/../../escaped.log", b"x").is_err());
        assert!(!root.path().join("escaped.log").exists());
        assert!(sinks.is_empty());
    }

    #[test]
    fn concurrent_writers_produce_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = Arc::new(LogSinks::new(dir.path(), false));
        let writers = 32;

        let threads: Vec<_> = (0..writers)
            .map(|i| {
                let sinks = sinks.clone();
                thread::spawn(move || {
                    let line = format!("writer-{i}-{}\n", "x".repeat(512));
                    sinks.append("shared.log", line.as_bytes()).unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        sinks.close_all().unwrap();

        let text = fs::read_to_string(dir.path().join("shared.log")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), writers);
        for line in lines {
            assert!(line.starts_with("writer-"), "corrupt line: {line}");
            assert!(line.ends_with(&"x".repeat(512)), "corrupt line: {line}");
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let sinks = LogSinks::new(".", false);
        assert!(matches!(sinks.open("  "), Err(ShellError::ConfigError(_))));
    }
}
