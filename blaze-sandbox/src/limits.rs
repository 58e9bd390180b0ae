//! Bounds applied to every build-and-execute request

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and size limits for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineLimits {
    /// Maximum time to persist the submitted source
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Maximum wall-clock time for one compiler invocation
    #[serde(with = "humantime_serde")]
    pub compile_timeout: Duration,

    /// Maximum wall-clock time for a running program (None = until it exits)
    #[serde(with = "humantime_serde")]
    pub run_timeout: Option<Duration>,

    /// Largest accepted source file in bytes
    pub max_source_bytes: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(5),
            compile_timeout: Duration::from_secs(10),
            run_timeout: None,
            max_source_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl PipelineLimits {
    /// Set the compile timeout
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    /// Bound how long a program may run
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Reject zero durations and zero sizes, which would fail every request.
    pub fn validate(&self) -> Result<(), String> {
        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than zero".to_string());
        }
        if self.compile_timeout.is_zero() {
            return Err("compile_timeout must be greater than zero".to_string());
        }
        if self.run_timeout.is_some_and(|t| t.is_zero()) {
            return Err("run_timeout must be greater than zero when set".to_string());
        }
        if self.max_source_bytes == 0 {
            return Err("max_source_bytes must be greater than zero".to_string());
        }
        Ok(())
    }
}
