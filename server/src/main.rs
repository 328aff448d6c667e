use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use availability_server::config::ServiceConfig;
use availability_server::{build_app, ServiceContext};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let config = ServiceConfig::parse();
    tracing::info!(
        ils = %config.ils_api,
        solr = %config.solr_url,
        core = %config.solr_core,
        "availability service starting up"
    );

    let port = config.port;
    let svc = Arc::new(ServiceContext::new(config)?);
    let app: Router = build_app(svc);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
