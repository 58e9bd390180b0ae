use anyhow::Result;
use blaze_server::{logging, run_server, ServerConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "blaze-server")]
#[command(about = "Build, run and transpile server for the Blaze playground")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "BLAZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "BLAZE_BIND")]
    pub bind: Option<SocketAddr>,

    /// Scratch directory for uploaded source and build artifacts
    #[arg(long, env = "BLAZE_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Blaze compiler executable
    #[arg(long, env = "BLAZE_COMPILER")]
    pub compiler: Option<PathBuf>,

    /// Compile timeout (e.g. "10s")
    #[arg(long, value_parser = parse_duration)]
    pub compile_timeout: Option<Duration>,

    /// Run timeout for programs (e.g. "30s"); unbounded by default
    #[arg(long, value_parser = parse_duration)]
    pub run_timeout: Option<Duration>,

    /// Also write logs to this file
    #[arg(long, env = "BLAZE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch_dir = dir.clone();
        }
        if let Some(compiler) = &self.compiler {
            config.compiler = compiler.clone();
        }
        if let Some(timeout) = self.compile_timeout {
            config.limits.compile_timeout = timeout;
        }
        if let Some(timeout) = self.run_timeout {
            config.limits.run_timeout = Some(timeout);
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(input).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    let _guard = logging::init_tracing(args.verbose, config.log_file.as_deref())?;

    run_server(config).await
}
