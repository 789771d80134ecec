// src/exec/preflight.rs

//! Checks done before any process is spawned.
//!
//! A missing working directory or binary is a configuration problem, so it
//! is detected here and reported with its own [`FailureKind`] instead of
//! surfacing later as a generic OS error from `spawn`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::errors::{FailureKind, FatalError};
use crate::exec::request::ExecutionRequest;

/// Validate the request and return the resolved program path.
pub fn preflight(request: &ExecutionRequest) -> Result<PathBuf, FatalError> {
    let fail = |kind| FatalError::new(kind, &request.command, request.working_dir.clone());

    if let Some(dir) = &request.working_dir {
        if !dir.is_dir() {
            return Err(fail(FailureKind::WorkingDirectoryMissing));
        }
    }

    let program = request.command.program();
    if program.is_empty() {
        return Err(fail(FailureKind::SpawnFailed {
            reason: "empty command".to_string(),
        }));
    }

    let path_var = request
        .env
        .iter()
        .rev()
        .find(|(k, _)| k == "PATH")
        .map(|(_, v)| OsString::from(v))
        .or_else(|| std::env::var_os("PATH"));

    resolve_program(program, request.working_dir.as_deref(), path_var.as_deref()).ok_or_else(
        || {
            fail(FailureKind::BinaryNotFound {
                program: program.to_string(),
            })
        },
    )
}

/// Locate `program` the way the OS would when spawning it.
///
/// Names containing a path separator are taken relative to `cwd`; bare
/// names are searched on `path_var`. The result is absolute, so it stays
/// valid after the child's working directory is changed to `cwd`.
pub fn resolve_program(
    program: &str,
    cwd: Option<&Path>,
    path_var: Option<&std::ffi::OsStr>,
) -> Option<PathBuf> {
    let candidate = Path::new(program);

    let found = if candidate.components().count() > 1 || candidate.is_absolute() {
        let full = match cwd {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate.to_path_buf(),
        };
        with_extensions(&full).into_iter().find(|p| is_executable(p))
    } else {
        std::env::split_paths(path_var?)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| with_extensions(&dir.join(program)))
            .find(|p| is_executable(p))
    }?;

    std::path::absolute(&found).ok()
}

fn with_extensions(path: &Path) -> Vec<PathBuf> {
    let mut out = vec![path.to_path_buf()];
    if cfg!(windows) && path.extension().is_none() {
        for ext in ["exe", "cmd", "bat"] {
            out.push(path.with_extension(ext));
        }
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
