//! Process-group isolation for the compiler and user programs
//!
//! Children are started as leaders of a fresh process group so that anything
//! they fork (the compiler's `go build`, a program's background jobs) can be
//! killed together with them.

use tokio::process::{Child, Command};
use tracing::debug;

/// Start the command's child in a new process group.
pub(crate) fn isolate(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Kills a child's whole process group, at the latest when dropped.
#[derive(Debug)]
pub(crate) struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    /// Track the group led by `child`, which must come from [`isolate`].
    pub(crate) fn of(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    /// SIGKILL every process in the group. Only the first call signals.
    pub(crate) fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        debug!(pgid, "Killed process group");
    }
}

#[cfg(not(unix))]
fn kill_group(pgid: u32) {
    debug!(pgid, "Process groups unsupported, relying on kill_on_drop");
}
