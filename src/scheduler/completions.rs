// src/scheduler/completions.rs

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::ExecResult;

/// Results of a batch in completion order, tagged with their input index.
#[derive(Debug)]
pub struct Completions {
    pub(crate) rx: mpsc::Receiver<(usize, ExecResult)>,
    pub(crate) batch: CancellationToken,
    pub(crate) remaining: usize,
}

impl Completions {
    /// Next finished task, or `None` once every task has reported.
    pub async fn next(&mut self) -> Option<(usize, ExecResult)> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.rx.recv().await?;
        self.remaining -= 1;
        Some(item)
    }

    /// Tasks that have not reported yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Cancel every task of this batch that is still running.
    pub fn cancel_remaining(&self) {
        self.batch.cancel();
    }
}

/// First finished task of an `await_any` batch, plus the rest of the batch.
#[derive(Debug)]
pub struct FirstCompletion {
    pub index: usize,
    pub result: ExecResult,
    pub rest: Completions,
}
