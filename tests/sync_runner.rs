// tests/sync_runner.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, test_context};

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use buildshell::{ExecutionRequest, FailureKind};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn echo_ok_under_fail_fast() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(&ExecutionRequest::argv(["echo", "ok"]))?;

    assert_eq!(res.exit_code, 0);
    assert_eq!(res.stdout, b"ok\n");
    assert!(res.stderr.is_empty());
    Ok(())
}

#[test]
fn tolerated_failure_returns_the_result() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(
        &ExecutionRequest::shell("echo out; echo err >&2; exit 3").tolerate_failure(),
    )?;

    assert_eq!(res.exit_code, 3);
    assert!(!res.success());
    assert_eq!(res.stdout_lossy(), "out\n");
    assert_eq!(res.stderr_lossy(), "err\n");
    Ok(())
}

#[test]
fn fail_fast_reports_code_command_and_tail() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let err = ctx
        .run(&ExecutionRequest::shell("echo compiling; echo 'error: boom' >&2; exit 42").in_dir(work.path()))
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::NonZeroExit { code: 42 });
    assert_eq!(err.exit_code(), Some(42));
    assert_eq!(err.working_dir.as_deref(), Some(work.path()));
    assert!(err.output_tail.iter().any(|l| l == "error: boom"));
    let msg = err.to_string();
    assert!(msg.contains("exit 42"), "{msg}");
    assert!(msg.contains("error: boom"), "{msg}");
    Ok(())
}

#[test]
fn missing_binary_is_never_tolerated() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let err = ctx
        .run(&ExecutionRequest::argv(["buildshell-missing-tool", "--help"]).tolerate_failure())
        .unwrap_err();

    assert!(matches!(err.kind, FailureKind::BinaryNotFound { ref program } if program == "buildshell-missing-tool"));
    assert!(err.is_configuration_error());
    Ok(())
}

#[test]
fn missing_working_dir_is_never_tolerated() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let err = ctx
        .run(
            &ExecutionRequest::argv(["echo", "hi"])
                .in_dir(logs.path().join("does-not-exist"))
                .tolerate_failure(),
        )
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::WorkingDirectoryMissing);
    Ok(())
}

#[test]
fn runs_in_the_requested_directory() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(&ExecutionRequest::argv(["pwd", "-P"]).in_dir(work.path()))?;

    assert_eq!(
        res.stdout_lossy().trim_end(),
        work.path().canonicalize()?.to_string_lossy()
    );
    Ok(())
}

#[test]
fn crlf_output_is_normalized() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(&ExecutionRequest::shell(r"printf 'a\r\nb\r\nc'"))?;

    assert_eq!(res.stdout, b"a\nb\nc");
    Ok(())
}

#[test]
fn merged_stderr_lands_in_stdout() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(&ExecutionRequest::shell("echo warn >&2").merge_stderr())?;

    assert_eq!(res.stdout_lossy(), "warn\n");
    assert!(res.stderr.is_empty());
    Ok(())
}

#[test]
fn extra_environment_is_visible() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let res = ctx.run(&ExecutionRequest::shell("echo $RECIPE_NAME").env("RECIPE_NAME", "glib"))?;

    assert_eq!(res.stdout_lossy(), "glib\n");
    Ok(())
}

#[test]
fn output_is_written_to_the_log_sink() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    ctx.run(&ExecutionRequest::shell("echo one; echo two >&2; echo three").log_to("zlib/build.log"))?;
    ctx.sinks().close_all()?;

    let text = fs::read_to_string(logs.path().join("zlib/build.log"))?;
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["one", "three", "two"]);
    Ok(())
}

#[test]
fn log_sink_is_written_while_the_command_runs() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);
    let log_path = logs.path().join("slow.log");

    let runner = ctx.clone();
    let handle = std::thread::spawn(move || {
        runner.run(&ExecutionRequest::shell("echo first; sleep 2; echo second").log_to("slow.log"))
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let text = fs::read_to_string(&log_path).unwrap_or_default();
        if text.contains("first") {
            assert!(!text.contains("second"));
            assert!(!handle.is_finished());
            break;
        }
        assert!(Instant::now() < deadline, "first line never streamed");
        std::thread::sleep(Duration::from_millis(20));
    }

    let res = handle.join().expect("runner thread panicked")?;
    assert_eq!(res.stdout_lossy(), "first\nsecond\n");
    Ok(())
}

#[test]
fn call_and_check_output_helpers() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    ctx.call("echo patched > marker", Some(work.path()), None)?;
    let out = ctx.check_output(
        buildshell::Command::argv(["cat", "marker"]),
        Some(work.path()),
        buildshell::FailPolicy::FailFast,
        None,
    )?;
    assert_eq!(out, "patched\n");

    let tolerated = ctx.check_output(
        "cat missing-file",
        Some(work.path()),
        buildshell::FailPolicy::TolerateFailure,
        None,
    )?;
    assert!(tolerated.is_empty());
    Ok(())
}

#[test]
fn relative_program_in_relative_dir() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    // Integration tests run with the package root as cwd.
    let work = tempfile::Builder::new().prefix("relative-dir-").tempdir_in(".")?;
    let rel = std::path::PathBuf::from(work.path().file_name().ok_or("no file name")?);
    let script = rel.join("configure");
    fs::write(&script, "#!/bin/sh\necho configured\n")?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let res = ctx.run(&ExecutionRequest::argv(["./configure"]).in_dir(&rel))?;

    assert_eq!(res.stdout_lossy(), "configured\n");
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn background_output_holder_does_not_hang_a_blocking_run() -> TestResult {
    use crate::common::is_running;

    init_tracing();
    let logs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let ctx = test_context(logs.path(), 2);

    let started = Instant::now();
    let res = ctx.run(
        &ExecutionRequest::shell("sleep 20 & echo $! > sleep.pid; echo started").in_dir(work.path()),
    )?;

    assert_eq!(res.stdout_lossy(), "started\n");
    assert!(started.elapsed() < Duration::from_secs(8));

    let sleep_pid: i32 = fs::read_to_string(work.path().join("sleep.pid"))?.trim().parse()?;
    let deadline = Instant::now() + Duration::from_secs(2);
    while is_running(sleep_pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!is_running(sleep_pid), "background sleep outlived the command");
    Ok(())
}
