//! Common test utilities shared across integration and E2E tests

use anyhow::{Context, Result};
use blaze_server::ServerConfig;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Stub compiler: copies the source to the artifact path and marks it
/// executable, so a shell script submitted as source runs as the program.
pub const COPYING_COMPILER: &str = r#"#!/bin/sh
mode="$1"
src="$2"
out="${src%.*}"
if [ "$mode" = "transpile" ]; then
    out="$out.go"
fi
cp "$src" "$out" && chmod +x "$out"
"#;

/// Stub compiler that always fails with a diagnostic.
pub const FAILING_COMPILER: &str =
    "#!/bin/sh\necho \"main.blz:1: syntax error near '!'\" >&2\nexit 2\n";

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("blaze_server=debug,blaze_sandbox=debug")
        .with_test_writer()
        .try_init();
}

/// Write an executable script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Playground server running in-process on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub root: TempDir,
    pub client: reqwest::Client,
    scratch_dir: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    /// Start a server whose compiler is the given shell script
    pub async fn start(compiler_script: &str) -> Result<Self> {
        Self::start_with(compiler_script, |_| {}).await
    }

    /// Start a server, letting the caller adjust the configuration
    pub async fn start_with(
        compiler_script: &str,
        configure: impl FnOnce(&mut ServerConfig),
    ) -> Result<Self> {
        setup_test_logging();

        let root = tempfile::tempdir().context("create temp dir")?;
        let compiler = write_script(root.path(), "blaze", compiler_script)?;
        let mut config = ServerConfig {
            scratch_dir: root.path().join("uploads"),
            compiler,
            ..ServerConfig::default()
        };
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let scratch_dir = config.scratch_dir.clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            blaze_server::serve(listener, &config, async {
                let _ = shutdown_rx.await;
            })
            .await
        });

        Ok(Self {
            addr,
            root,
            client: reqwest::Client::new(),
            scratch_dir,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a `{file, content}` body
    pub async fn post(&self, path: &str, file: &str, content: &str) -> Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .json(&serde_json::json!({ "file": file, "content": content }))
            .send()
            .await
            .with_context(|| format!("POST {path}"))
    }

    /// Files currently in the scratch directory
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.scratch_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Wait until the scratch directory is empty or `timeout` passes
    pub async fn wait_for_empty_scratch(&self, timeout: std::time::Duration) -> Vec<PathBuf> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let entries = self.scratch_entries();
            if entries.is_empty() || tokio::time::Instant::now() >= deadline {
                return entries;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
    }

    /// Shut down gracefully and return the server's result
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.context("server task panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
