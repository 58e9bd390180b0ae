//! Blaze playground server
//!
//! HTTP front end of the browser IDE: `/build`, `/run` and `/transpile`
//! hand submitted source to the Blaze compiler and return the artifact, the
//! translated source, or the program's live output.

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::ArtifactResponse;
pub use server::{create_router, run_server, serve, shutdown_signal, AppState};
