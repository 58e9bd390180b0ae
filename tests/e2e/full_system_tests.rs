//! Full system tests: configuration file to running server and back

use crate::common::{setup_test_logging, write_script, TestServer, COPYING_COMPILER};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blaze_server::ServerConfig;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_server_from_config_file() -> Result<()> {
    setup_test_logging();
    let root = tempfile::tempdir()?;
    let compiler = write_script(root.path(), "blaze", COPYING_COMPILER)?;
    let scratch = root.path().join("scratch");

    let config_path = root.path().join("playground.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
scratch_dir = "{}"
compiler = "{}"

[limits]
compile_timeout = "5s"
run_timeout = "3s"
"#,
            scratch.display(),
            compiler.display()
        ),
    )?;

    let config = ServerConfig::load(&config_path)?;
    config.validate()?;
    assert_eq!(config.limits.run_timeout, Some(Duration::from_secs(3)));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        blaze_server::serve(listener, &config, async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    let client = reqwest::Client::new();
    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["status"], "healthy");
    assert!(scratch.is_dir(), "scratch directory is created at startup");

    let response = client
        .post(format!("http://{addr}/build"))
        .json(&serde_json::json!({ "file": "main.blz", "content": "println(\"hi\")!" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    let content = STANDARD.decode(body["content"].as_str().context("content")?)?;
    assert_eq!(content, b"println(\"hi\")!");

    let _ = shutdown_tx.send(());
    server.await.context("server task panicked")??;
    assert_eq!(std::fs::read_dir(&scratch)?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_timeout_ends_stream() -> Result<()> {
    let server = TestServer::start_with(COPYING_COMPILER, |config| {
        config.limits.run_timeout = Some(Duration::from_millis(500));
    })
    .await?;

    let mut response = server
        .post("/run", "main.blz", "#!/bin/sh\necho waiting\nexec sleep 30\n")
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let first = response.chunk().await?.context("first chunk")?;
    assert!(first.starts_with(b"waiting"));

    // The body is aborted rather than completed once the limit passes.
    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match response.chunk().await {
                Ok(Some(_)) => continue,
                other => return other.map(|_| ()),
            }
        }
    })
    .await
    .context("stream outlived the run timeout")?;
    assert!(rest.is_err());

    let remaining = server.wait_for_empty_scratch(Duration::from_secs(2)).await;
    assert!(remaining.is_empty(), "left behind: {remaining:?}");
    server.stop().await
}

#[tokio::test]
async fn test_startup_fails_without_usable_scratch_dir() -> Result<()> {
    setup_test_logging();
    let root = tempfile::tempdir()?;
    let blocker = root.path().join("not-a-dir");
    std::fs::write(&blocker, b"")?;

    let config = ServerConfig {
        scratch_dir: blocker.join("uploads"),
        compiler: root.path().join("blaze"),
        ..ServerConfig::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let result = blaze_server::serve(listener, &config, std::future::pending()).await;

    let err = result.expect_err("scratch dir under a regular file must be rejected");
    assert!(err.to_string().contains("not usable"), "{err:#}");
    Ok(())
}
