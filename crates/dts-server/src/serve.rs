//! Binds the configured transport (stdio by default, streamable HTTP when
//! `TRANSPORT=http`) and serves the tool catalog until the client disconnects
//! or the process receives a shutdown signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use dts_config::{ServerConfig, Transport};
use dts_dispatch::Dispatcher;
use dts_session::SessionStore;
use rmcp::ServiceExt;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use tokio_util::sync::CancellationToken;

use crate::tools::DevToolsServer;

pub async fn handle_serve_command(config: Arc<ServerConfig>) -> Result<()> {
    std::fs::create_dir_all(&config.storage_dir)
        .with_context(|| format!("creating storage dir {}", config.storage_dir.display()))?;

    let sessions = Arc::new(SessionStore::new(
        config.sandbox_root.clone(),
        config.storage_dir.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(config.clone(), sessions));
    let server = DevToolsServer::new(dispatcher);

    match config.transport {
        Transport::Stdio => run_stdio(server).await,
        Transport::Http => run_http(server, &config).await,
    }
}

async fn run_stdio(server: DevToolsServer) -> Result<()> {
    tracing::info!("dev-tools-mcp serving over stdio");
    let running = server
        .serve((tokio::io::stdin(), tokio::io::stdout()))
        .await
        .context("starting stdio MCP transport")?;
    running.waiting().await.context("MCP stdio session ended")?;
    Ok(())
}

async fn run_http(server: DevToolsServer, config: &ServerConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let ct = CancellationToken::new();
    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind: bind_addr,
        sse_path: "/".to_string(),
        post_path: "/message".to_string(),
        ct: ct.clone(),
        sse_keep_alive: None,
    });
    let _server_ct = sse_server.with_service_directly(move || server.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding MCP HTTP endpoint at {bind_addr}"))?;
    tracing::info!(%bind_addr, "dev-tools-mcp serving over streamable HTTP");

    let shutdown = ct.clone();
    let serve_task = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    ct.cancel();
    let _ = serve_task.await;
    Ok(())
}
