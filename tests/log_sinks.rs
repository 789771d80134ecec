// tests/log_sinks.rs
#![cfg(unix)]

mod common;
use crate::common::builders::EngineConfigBuilder;
use crate::common::{init_tracing, test_context, with_timeout};

use std::error::Error;

use buildshell::{ExecutionRequest, ShellContext};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_write_whole_lines_to_one_sink() -> TestResult {
    with_timeout(async {
        init_tracing();
        let logs = tempfile::tempdir()?;
        let ctx = test_context(logs.path(), 8);
        let tasks = 24;
        let payload = "y".repeat(2000);

        let results = ctx
            .scheduler()
            .await_all(
                (0..tasks)
                    .map(|i| {
                        ExecutionRequest::shell(format!("echo task-{i}-{payload}"))
                            .log_to("fetch-all.log")
                            .io_bound()
                    })
                    .collect(),
            )
            .await;
        assert!(results.iter().all(|r| r.is_ok()));
        ctx.shutdown().await?;

        let text = std::fs::read_to_string(logs.path().join("fetch-all.log"))?;
        let mut ids: Vec<usize> = text
            .lines()
            .map(|line| {
                let rest = line.strip_prefix("task-").expect("line starts mid-write");
                let (id, tail) = rest.split_once('-').expect("malformed line");
                assert_eq!(tail, payload, "line was interleaved");
                id.parse().expect("numeric id")
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..tasks).collect::<Vec<_>>());
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[test]
fn timestamps_prefix_each_line_when_enabled() -> TestResult {
    init_tracing();
    let logs = tempfile::tempdir()?;
    let ctx = ShellContext::new(
        EngineConfigBuilder::new()
            .log_dir(logs.path())
            .timestamps(true)
            .build(),
    );

    ctx.run(&ExecutionRequest::shell("echo a; echo b").log_to("stamped.log"))?;

    let text = std::fs::read_to_string(logs.path().join("stamped.log"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, want) in lines.iter().zip(["a", "b"]) {
        // "YYYY-MM-DD HH:MM:SS.mmm <output>"
        assert_eq!(line.as_bytes()[4], b'-', "{line}");
        assert!(line.ends_with(&format!(" {want}")), "{line}");
    }
    Ok(())
}
