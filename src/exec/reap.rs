// src/exec/reap.rs

//! Cleanup of processes a command leaves behind.
//!
//! Every child is started as the leader of its own process group (unix). A
//! leader that exits while a background descendant still holds its output
//! pipes would otherwise keep the capture, and any pool slot, open until
//! that descendant exits on its own.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// How long output may stay open after the group leader has exited.
pub const ORPHAN_GRACE: Duration = Duration::from_secs(2);

/// SIGKILL every process in the group led by `pgid`.
///
/// A group that no longer exists is not an error.
pub(crate) fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) => debug!(pgid, "killed process group"),
            Err(Errno::ESRCH) => {}
            Err(e) => debug!(pgid, error = %e, "killpg failed"),
        }
    }

    #[cfg(not(unix))]
    let _ = pgid;
}

/// Await every pump, removing each handle once it has completed.
///
/// Safe to drop midway: handles that have not finished stay in `pumps`.
pub(crate) async fn drain(pumps: &mut Vec<JoinHandle<()>>) {
    while let Some(pump) = pumps.last_mut() {
        let _ = pump.await;
        pumps.pop();
    }
}

pub(crate) fn abort_all(pumps: &[JoinHandle<()>]) {
    for pump in pumps {
        pump.abort();
    }
}
