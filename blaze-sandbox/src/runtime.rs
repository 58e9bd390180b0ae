//! Runtime trait and implementations

mod process;

use crate::error::Result;
use crate::scratch::ScratchFiles;
use crate::types::ExecutionStream;
use async_trait::async_trait;
use std::time::Duration;

pub use process::ProcessRuntime;

/// Runtime abstraction for executing compiled artifacts
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Start the artifact in `files` and stream its output.
    ///
    /// The runtime takes ownership of `files` and removes them when the
    /// execution ends, however it ends.
    async fn execute(
        &self,
        files: ScratchFiles,
        timeout: Option<Duration>,
    ) -> Result<ExecutionStream>;

    /// Get runtime name
    fn name(&self) -> &str;
}
