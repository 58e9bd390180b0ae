//! Build service - composes scratch files, the compiler and the runtime

use crate::compiler::{Compiler, CompilerMode};
use crate::error::{Result, SandboxError};
use crate::limits::PipelineLimits;
use crate::runtime::{ProcessRuntime, Runtime};
use crate::scratch::{SafeBaseName, ScratchFiles, ScratchStore};
use crate::types::{Artifact, BuildRequest, ExecutionStream};
use std::sync::Arc;
use tracing::{debug, info};

const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
const TRANSLATED_CONTENT_TYPE: &str = "text/plain";

/// Runs the write → compile → {read | run} → cleanup pipeline.
///
/// Holds no per-request state; every call owns its own scratch files.
#[derive(Clone)]
pub struct BuildService {
    store: ScratchStore,
    compiler: Compiler,
    runtime: Arc<dyn Runtime>,
    limits: PipelineLimits,
    transpile_extension: String,
}

impl BuildService {
    /// Create a service executing artifacts as plain processes
    pub fn new(store: ScratchStore, compiler: Compiler) -> Self {
        Self::with_runtime(store, compiler, ProcessRuntime::new())
    }

    /// Create a service with a custom runtime implementation.
    pub fn with_runtime(
        store: ScratchStore,
        compiler: Compiler,
        runtime: impl Runtime + 'static,
    ) -> Self {
        Self {
            store,
            compiler,
            runtime: Arc::new(runtime),
            limits: PipelineLimits::default(),
            transpile_extension: "go".to_string(),
        }
    }

    pub fn with_limits(mut self, limits: PipelineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Extension of translated source files (without the dot)
    pub fn with_transpile_extension(mut self, extension: impl Into<String>) -> Self {
        self.transpile_extension = extension.into();
        self
    }

    pub fn store(&self) -> &ScratchStore {
        &self.store
    }

    pub fn limits(&self) -> &PipelineLimits {
        &self.limits
    }

    /// Get the runtime name
    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Compile to a binary and return its bytes.
    pub async fn build(&self, request: &BuildRequest) -> Result<Artifact> {
        let files = self.prepare(request, None).await?;
        self.compiler
            .compile(&files, CompilerMode::Build, self.limits.compile_timeout)
            .await?;
        self.read_back(files, BINARY_CONTENT_TYPE).await
    }

    /// Translate the source and return the translated text.
    pub async fn transpile(&self, request: &BuildRequest) -> Result<Artifact> {
        let files = self
            .prepare(request, Some(self.transpile_extension.as_str()))
            .await?;
        self.compiler
            .compile(&files, CompilerMode::Transpile, self.limits.compile_timeout)
            .await?;
        self.read_back(files, TRANSLATED_CONTENT_TYPE).await
    }

    /// Compile and start the program, returning its live output.
    ///
    /// Scratch files belong to the returned stream from here on.
    pub async fn run(&self, request: &BuildRequest) -> Result<ExecutionStream> {
        let files = self.prepare(request, None).await?;
        self.compiler
            .compile(&files, CompilerMode::Build, self.limits.compile_timeout)
            .await?;

        info!(
            stem = files.stem(),
            runtime = self.runtime.name(),
            "Starting program"
        );
        self.runtime.execute(files, self.limits.run_timeout).await
    }

    /// Validate the request, reserve scratch files and persist the source.
    async fn prepare(
        &self,
        request: &BuildRequest,
        artifact_extension: Option<&str>,
    ) -> Result<ScratchFiles> {
        let name = SafeBaseName::parse(&request.file)?;

        let size = request.content.len();
        if size > self.limits.max_source_bytes {
            return Err(SandboxError::SourceTooLarge {
                size,
                limit: self.limits.max_source_bytes,
            });
        }

        let files = self.store.allocate(&name, artifact_extension).await?;
        self.store
            .write(&files, request.content.as_bytes(), self.limits.write_timeout)
            .await?;

        debug!(stem = files.stem(), size, "Source written");
        Ok(files)
    }

    async fn read_back(&self, files: ScratchFiles, content_type: &'static str) -> Result<Artifact> {
        let content = tokio::fs::read(files.artifact()).await?;
        let name = files.artifact_name();
        files.cleanup().await;

        debug!(%name, bytes = content.len(), "Artifact read");
        Ok(Artifact {
            name,
            content_type,
            content,
        })
    }
}
