//! Server configuration

use blaze_sandbox::{BuildService, Compiler, PipelineLimits, ScratchStore};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Process-wide settings, fixed at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,

    /// Directory for per-request scratch files
    pub scratch_dir: PathBuf,

    /// Blaze compiler executable
    pub compiler: PathBuf,

    /// Extension given to persisted source files
    pub source_extension: String,

    /// Extension of transpiler output
    pub transpile_extension: String,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,

    /// Optional log file, written in addition to stderr
    pub log_file: Option<PathBuf>,

    pub limits: PipelineLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            scratch_dir: PathBuf::from("uploads"),
            compiler: PathBuf::from("./blaze"),
            source_extension: "blz".to_string(),
            transpile_extension: "go".to_string(),
            max_body_bytes: 4 * 1024 * 1024,
            log_file: None,
            limits: PipelineLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, ext) in [
            ("source_extension", &self.source_extension),
            ("transpile_extension", &self.transpile_extension),
        ] {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be a bare extension, got {ext:?}"
                )));
            }
        }
        if self.source_extension == self.transpile_extension {
            return Err(ConfigError::Invalid(
                "source_extension and transpile_extension must differ".to_string(),
            ));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("scratch_dir must be set".to_string()));
        }
        if self.compiler.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("compiler must be set".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.limits.validate().map_err(ConfigError::Invalid)
    }

    /// Assemble the build pipeline described by this configuration.
    pub fn build_service(&self) -> BuildService {
        let store = ScratchStore::new(&self.scratch_dir)
            .with_source_extension(&self.source_extension);
        BuildService::new(store, Compiler::new(&self.compiler))
            .with_limits(self.limits.clone())
            .with_transpile_extension(&self.transpile_extension)
    }
}
