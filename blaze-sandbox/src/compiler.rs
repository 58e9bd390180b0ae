//! External compiler invocation
//!
//! The Blaze compiler is an opaque executable: `<program> build <source>`
//! writes a binary next to the source with the extension stripped, and
//! `<program> transpile <source>` writes translated source next to it.

use crate::error::{Result, SandboxError};
use crate::process_group::{isolate, ProcessGroup};
use crate::scratch::ScratchFiles;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Which compiler subcommand to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerMode {
    Build,
    Transpile,
}

impl CompilerMode {
    pub fn subcommand(self) -> &'static str {
        match self {
            CompilerMode::Build => "build",
            CompilerMode::Transpile => "transpile",
        }
    }
}

impl std::fmt::Display for CompilerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subcommand())
    }
}

/// Handle to the external compiler executable
#[derive(Debug, Clone)]
pub struct Compiler {
    program: PathBuf,
}

impl Compiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Compile the source in `files`, returning the artifact path.
    ///
    /// One attempt only. On timeout the compiler and everything it started
    /// are killed before this returns.
    pub async fn compile(
        &self,
        files: &ScratchFiles,
        mode: CompilerMode,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let mut command = Command::new(&self.program);
        command
            .arg(mode.subcommand())
            .arg(files.source())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            program = %self.program.display(),
            %mode,
            source = %files.source().display(),
            "Invoking compiler"
        );

        let mut child = isolate(&mut command).spawn().map_err(|source| {
            SandboxError::CompilerUnavailable {
                program: self.program.display().to_string(),
                source,
            }
        })?;
        let mut group = ProcessGroup::of(&child);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(timeout, async {
            tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(result) => result?,
            Err(_) => {
                warn!(%mode, ?timeout, "Compiler timed out");
                group.kill();
                if let Err(e) = child.wait().await {
                    debug!("Failed to reap compiler: {}", e);
                }
                return Err(SandboxError::CompileTimeout(timeout));
            }
        };
        // Helpers the compiler left running must not touch the scratch files.
        group.kill();

        if !status.success() {
            // Prefer stderr; some compilers report everything on stdout.
            let diagnostics = if stderr.iter().all(u8::is_ascii_whitespace) {
                String::from_utf8_lossy(&stdout).into_owned()
            } else {
                String::from_utf8_lossy(&stderr).into_owned()
            };
            info!(%mode, %status, "Compilation failed");
            return Err(SandboxError::CompileFailure {
                status: status.to_string(),
                diagnostics,
            });
        }

        let artifact = files.artifact().to_path_buf();
        if tokio::fs::metadata(&artifact).await.is_err() {
            return Err(SandboxError::MissingArtifact(artifact));
        }

        Ok(artifact)
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
