//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! database, the inference orchestrator and its health monitor, and the MCP
//! tool handler into a running server.

use crate::tools::DojoTools;
use anyhow::Result;
use dojo::config::DojoConfig;
use dojo::inference::{HealthMonitor, Orchestrator};
use dojo::summon::Summoner;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared setup: open DB, build the orchestrator, start health monitoring.
fn setup_shared_state(config: &DojoConfig) -> Result<(Summoner, Option<HealthMonitor>)> {
    let db_path = config.resolved_db_path();
    let conn = dojo::db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let orchestrator = Arc::new(Orchestrator::from_config(&config.inference)?);
    let monitor = if config.inference.enabled && config.inference.health_interval_secs > 0 {
        let interval = Duration::from_secs(config.inference.health_interval_secs);
        tracing::info!(
            url = %config.inference.base_url,
            every_secs = interval.as_secs(),
            "inference health monitor started"
        );
        Some(orchestrator.spawn_health_monitor(interval))
    } else {
        None
    };

    let summoner = Summoner::new(
        Arc::new(Mutex::new(conn)),
        orchestrator,
        config.query.clone(),
    );
    Ok((summoner, monitor))
}

async fn stop_monitor(monitor: Option<HealthMonitor>) {
    if let Some(monitor) = monitor {
        monitor.shutdown().await;
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: DojoConfig) -> Result<()> {
    tracing::info!("starting Dojo MCP server on stdio");

    let (summoner, monitor) = setup_shared_state(&config)?;

    let tools = DojoTools::new(summoner);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    stop_monitor(monitor).await;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: DojoConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(addr = %bind_addr, "starting Dojo MCP server on HTTP");

    let (summoner, monitor) = setup_shared_state(&config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(DojoTools::new(summoner.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    stop_monitor(monitor).await;
    Ok(())
}
