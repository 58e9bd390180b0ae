//! Per-request scratch files
//!
//! Every request gets its own source/artifact pair inside the scratch
//! directory. Names are derived from the client's file name plus a random hex
//! suffix, and the source path is reserved with create-new semantics so two
//! requests can never share a path.

use crate::error::{Result, SandboxError};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Bytes of randomness in a scratch suffix (8 hex characters)
const SUFFIX_BYTES: usize = 4;

/// Attempts before giving up on finding a free name
const MAX_RESERVE_ATTEMPTS: usize = 8;

/// Longest accepted base name, leaving room for suffix and extension
const MAX_BASE_NAME_LEN: usize = 200;

/// A validated file stem that is safe to use as a path component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeBaseName(String);

impl SafeBaseName {
    /// Validate an untrusted client file name.
    ///
    /// Directory components are dropped (`src/main.blz` becomes `main`), the
    /// final extension is stripped, remaining dots become underscores, and
    /// anything that tries to walk out of the scratch directory is rejected
    /// rather than truncated.
    pub fn parse(file: &str) -> Result<Self> {
        let reject = |reason| SandboxError::InvalidFileName {
            name: file.to_string(),
            reason,
        };

        if file.chars().any(char::is_control) {
            return Err(reject("contains control characters"));
        }

        let mut components = file.split(['/', '\\']);
        if components.clone().any(|c| c == "..") {
            return Err(reject("contains a parent directory component"));
        }

        let last = components.next_back().unwrap_or_default();
        let stem = match last.rfind('.') {
            Some(0) | None => last,
            Some(idx) => &last[..idx],
        };

        if stem.trim_matches('.').is_empty() {
            return Err(reject("has an empty base name"));
        }
        if stem.len() > MAX_BASE_NAME_LEN {
            return Err(reject("base name is too long"));
        }

        // The compiler derives its output path from the first dot.
        Ok(Self(stem.replace('.', "_")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SafeBaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_suffix() -> String {
    let bytes: [u8; SUFFIX_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Scratch directory handle, injected at construction
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
    source_extension: String,
}

impl ScratchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            source_extension: "blz".to_string(),
        }
    }

    /// Extension given to persisted source files
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed and prove it is writable.
    pub async fn ensure_ready(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let probe = self.dir.join(format!(".probe-{}", random_suffix()));
        tokio::fs::write(&probe, b"").await?;
        tokio::fs::remove_file(&probe).await?;

        debug!(dir = %self.dir.display(), "Scratch directory ready");
        Ok(())
    }

    /// Reserve a fresh source/artifact pair for `name`.
    ///
    /// With `artifact_extension = None` the artifact is the bare stem (a
    /// compiled binary); otherwise it is `<stem>.<extension>`.
    pub async fn allocate(
        &self,
        name: &SafeBaseName,
        artifact_extension: Option<&str>,
    ) -> Result<ScratchFiles> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let stem = format!("{}{}", name, random_suffix());
            let source = self
                .dir
                .join(format!("{}.{}", stem, self.source_extension));

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&source)
                .await
            {
                Ok(_) => {
                    let artifact = match artifact_extension {
                        Some(ext) => self.dir.join(format!("{}.{}", stem, ext)),
                        None => self.dir.join(&stem),
                    };
                    debug!(source = %source.display(), "Reserved scratch file");
                    return Ok(ScratchFiles {
                        stem,
                        source,
                        artifact,
                        armed: true,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(source = %source.display(), "Scratch name taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SandboxError::NameExhausted(MAX_RESERVE_ATTEMPTS))
    }

    /// Persist `content` to the reserved source path within `timeout`.
    pub async fn write(
        &self,
        files: &ScratchFiles,
        content: &[u8],
        timeout: Duration,
    ) -> Result<()> {
        let write = async {
            // No `create`: if cleanup already removed the path, do not resurrect it.
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&files.source)
                .await?;
            file.write_all(content).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result.map_err(SandboxError::from),
            Err(_) => Err(SandboxError::WriteTimeout(timeout)),
        }
    }
}

/// Source and artifact paths owned by one in-flight request.
///
/// Both paths are removed exactly once: by [`ScratchFiles::cleanup`] on the
/// happy path, or synchronously on drop for every other exit.
#[derive(Debug)]
pub struct ScratchFiles {
    stem: String,
    source: PathBuf,
    artifact: PathBuf,
    armed: bool,
}

impl ScratchFiles {
    /// Base name plus random suffix, no extension
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// File name of the artifact, as offered for download
    pub fn artifact_name(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem.clone())
    }

    /// Delete both files. Missing files are fine.
    pub async fn cleanup(mut self) {
        self.armed = false;
        for path in [&self.source, &self.artifact] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "Removed scratch file"),
                Err(e) => log_cleanup_error(path, &e),
            }
        }
    }
}

// Blocking removal on whatever thread drops the handle. Only the abandoned
// paths get here, and unlinking two files is short.
impl Drop for ScratchFiles {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        for path in [&self.source, &self.artifact] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed scratch file on drop"),
                Err(e) => log_cleanup_error(path, &e),
            }
        }
    }
}

fn log_cleanup_error(path: &Path, error: &std::io::Error) {
    if error.kind() == ErrorKind::NotFound {
        debug!(path = %path.display(), "Scratch file already gone");
    } else {
        warn!(path = %path.display(), "Failed to delete scratch file: {}", error);
    }
}
