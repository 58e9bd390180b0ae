//! Core types for the build-and-execute pipeline

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Source submitted by the IDE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Client-side file name (untrusted)
    pub file: String,

    /// Source text
    pub content: String,
}

impl BuildRequest {
    pub fn new(file: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            content: content.into(),
        }
    }
}

/// Compiled binary or translated source, read back into memory
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Suggested download name
    pub name: String,

    /// MIME type of `content`
    pub content_type: &'static str,

    pub content: Vec<u8>,
}

/// Unique request identifier, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live output of a running program.
///
/// Yields stdout and stderr chunks in arrival order and ends once the
/// process has exited and its scratch files are gone. An `Err` item means
/// the execution broke and the consumer should abort. Dropping the stream
/// early kills the process and removes its scratch files.
pub struct ExecutionStream {
    pid: Option<u32>,
    inner: BoxStream<'static, std::io::Result<Bytes>>,
}

impl ExecutionStream {
    pub(crate) fn new(pid: Option<u32>, inner: BoxStream<'static, std::io::Result<Bytes>>) -> Self {
        Self { pid, inner }
    }

    /// OS process id of the running program
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl Stream for ExecutionStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ExecutionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStream")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}
