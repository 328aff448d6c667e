pub mod auth;
pub mod availability;
pub mod clients;
pub mod config;
pub mod error;
pub mod mailer;
pub mod reserves;

use anyhow::Result;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use availability_core::maps::MapTable;
use availability_core::notify::Mailboxes;

use crate::clients::Clients;
use crate::config::ServiceConfig;
use crate::mailer::Mailer;

/// Shared state for all handlers: configuration, outbound clients, the map
/// lookup tables and the mail transport. Read-only after startup.
pub struct ServiceContext {
    pub config: ServiceConfig,
    pub clients: Clients,
    pub maps: MapTable,
    pub mailer: Mailer,
}

pub type SharedContext = Arc<ServiceContext>;

impl ServiceContext {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let clients = Clients::new(&config)?;
        let maps = MapTable::load(&config.map_data);
        let mailer = Mailer::from_config(&config.smtp)?;
        Ok(Self { config, clients, maps, mailer })
    }

    pub fn mailboxes(&self) -> Mailboxes {
        Mailboxes {
            course_reserves: self.config.course_reserve_email.clone(),
            law_reserves: self.config.law_reserve_email.clone(),
            default_sender: self.config.smtp.sender.clone(),
        }
    }
}

pub fn build_app(svc: SharedContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(get_version))
        .route("/version", get(get_version))
        .route("/healthcheck", get(health_check))
        .route("/item/:id", get(availability::get_availability))
        .route("/reserves/search", get(reserves::search_reserves))
        .route("/reserves/validate", post(reserves::validate_reserves))
        .route("/reserves", post(reserves::create_reserves))
        .with_state(svc)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn get_version() -> Json<HashMap<String, String>> {
    let mut version = HashMap::new();
    version.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    version.insert(
        "build".to_string(),
        option_env!("BUILD_TAG").unwrap_or("unknown").to_string(),
    );
    Json(version)
}

#[derive(Serialize)]
struct HealthStatus {
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Reports dependency health. Always responds 200; per-dependency status is
/// in the body.
async fn health_check(State(svc): State<SharedContext>) -> Json<HashMap<String, HealthStatus>> {
    let mut report = HashMap::new();
    let ils = match svc.clients.ils_health().await {
        Ok(()) => HealthStatus { healthy: true, message: None },
        Err(message) => HealthStatus { healthy: false, message: Some(message) },
    };
    report.insert("ils_connector".to_string(), ils);
    Json(report)
}
