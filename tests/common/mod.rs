#![allow(dead_code)]

pub use buildshell_test_utils::builders;
pub use buildshell_test_utils::{has_binary, init_tracing, test_context, with_timeout};

use std::path::Path;
use std::time::Duration;

/// Poll until `path` exists and holds non-empty text, then return it trimmed.
pub async fn wait_for_file(path: &Path) -> String {
    for _ in 0..500 {
        if let Ok(text) = std::fs::read_to_string(path) {
            if text.ends_with('\n') {
                return text.trim().to_string();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never appeared", path.display());
}

/// Whether `pid` is a live (non-zombie) process. Linux only.
#[cfg(target_os = "linux")]
pub fn is_running(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Format: "<pid> (<comm>) <state> ..."; comm may contain spaces.
    match stat.rfind(')') {
        Some(idx) => !matches!(stat[idx + 1..].trim_start().chars().next(), Some('Z' | 'X')),
        None => false,
    }
}

/// Poll until `pid` is gone (or a zombie).
#[cfg(target_os = "linux")]
pub async fn wait_until_gone(pid: i32) -> bool {
    for _ in 0..200 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
