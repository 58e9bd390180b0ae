//! Process-based runtime

use crate::error::{Result, SandboxError};
use crate::process_group::{isolate, ProcessGroup};
use crate::scratch::ScratchFiles;
use crate::types::ExecutionStream;
use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Process-based runtime - executes compiled artifacts as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRuntime;

impl ProcessRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl super::Runtime for ProcessRuntime {
    async fn execute(
        &self,
        files: ScratchFiles,
        timeout: Option<Duration>,
    ) -> Result<ExecutionStream> {
        let mut command = Command::new(files.artifact());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = isolate(&mut command)
            .spawn()
            .map_err(SandboxError::Execution)?;

        let pid = child.id();
        info!(?pid, artifact = %files.artifact().display(), "Spawned program");

        let running = Running {
            group: ProcessGroup::of(&child),
            child,
            files,
        };
        let deadline = timeout.map(|t| Instant::now() + t);
        let output = program_output(running, deadline)?;

        Ok(ExecutionStream::new(pid, Box::pin(output)))
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// A started program and what has to go with it.
///
/// Fields drop in declaration order, so an abandoned execution kills the
/// whole process group before its scratch files are removed.
struct Running {
    group: ProcessGroup,
    child: Child,
    files: ScratchFiles,
}

/// Merge the child's pipes into one chunk stream that owns the program
/// until the end.
fn program_output(
    mut running: Running,
    deadline: Option<Instant>,
) -> Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static> {
    let missing = |pipe: &str| SandboxError::Execution(io::Error::other(format!("{pipe} not captured")));
    let stdout = ReaderStream::new(running.child.stdout.take().ok_or_else(|| missing("stdout"))?);
    let stderr = ReaderStream::new(running.child.stderr.take().ok_or_else(|| missing("stderr"))?);

    Ok(try_stream! {
        let mut pipes = stdout.merge(stderr);
        while let Some(chunk) = within(deadline, pipes.next()).await? {
            let chunk = chunk?;
            yield chunk;
        }

        let status = within(deadline, running.child.wait()).await??;
        debug!(%status, "Program exited");
        running.group.kill();
        running.files.cleanup().await;
    })
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> io::Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
            io::Error::new(io::ErrorKind::TimedOut, "program exceeded its run time limit")
        }),
        None => Ok(fut.await),
    }
}
