//! Blaze sandbox - build and execute untrusted Blaze source
//!
//! Persists submitted source to per-request scratch files, invokes the
//! external Blaze compiler under a timeout, and either reads the artifact
//! back or runs it while streaming its output. Scratch files are removed on
//! every exit path.

mod compiler;
mod error;
mod limits;
mod process_group;
mod runtime;
mod scratch;
mod service;
#[cfg(all(test, unix))]
mod testing;
mod types;

pub use compiler::{Compiler, CompilerMode};
pub use error::{Result, SandboxError};
pub use limits::PipelineLimits;
pub use runtime::{ProcessRuntime, Runtime};
pub use scratch::{SafeBaseName, ScratchFiles, ScratchStore};
pub use service::BuildService;
pub use types::{Artifact, BuildRequest, ExecutionId, ExecutionStream};
