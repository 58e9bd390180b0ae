//! Error types for the build-and-execute pipeline

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    #[error("Source is {size} bytes, limit is {limit}")]
    SourceTooLarge { size: usize, limit: usize },

    #[error("Writing source timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Could not reserve a unique scratch file after {0} attempts")]
    NameExhausted(usize),

    #[error("Scratch I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start compiler {program}: {source}")]
    CompilerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compiler timed out after {0:?}")]
    CompileTimeout(Duration),

    #[error("Compilation failed ({status})")]
    CompileFailure { status: String, diagnostics: String },

    #[error("Compiler reported success but produced no artifact at {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Failed to execute artifact: {0}")]
    Execution(#[source] std::io::Error),
}

impl SandboxError {
    /// True when the client sent something we refuse to process.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileName { .. } | Self::SourceTooLarge { .. }
        )
    }

    /// Compiler output worth showing to the user, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::CompileFailure { diagnostics, .. } if !diagnostics.trim().is_empty() => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}
