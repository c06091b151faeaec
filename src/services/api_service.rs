use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::Gateway;
use crate::modbus::SessionConnector;
use crate::utils::error::GatewayError;

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    pub field: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    fn from_gateway_error(err: &GatewayError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            code: err.kind().to_string(),
            field: err.field().map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

// API Service state
#[derive(Clone)]
pub struct ApiServiceState {
    pub config: Config,
    pub gateway: Gateway,
}

impl ApiServiceState {
    pub fn new(config: Config, connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            config,
            gateway: Gateway::new(connector),
        }
    }
}

// API Service
pub struct ApiService {
    state: ApiServiceState,
    server_handle: Option<actix_web::dev::ServerHandle>,
}

impl ApiService {
    pub fn new(config: Config, connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            state: ApiServiceState::new(config, connector),
            server_handle: None,
        }
    }

    pub async fn start(&mut self) -> std::io::Result<()> {
        let bind_address = self.state.config.bind_address();
        info!("🌐 Starting HTTP API server on {}", bind_address);

        let state = self.state.clone();
        let mut server = HttpServer::new(move || {
            let state = state.clone();
            App::new()
                .wrap(Logger::default())
                .configure(|cfg| configure_routes(cfg, &state))
        });

        if let Some(workers) = self.state.config.api.workers {
            server = server.workers(workers);
        }

        let server = server.bind(&bind_address)?.run();

        // Store server handle for graceful shutdown
        self.server_handle = Some(server.handle());

        // Start the server in background
        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("❌ HTTP API server error: {}", e);
            }
        });

        info!(
            "✅ HTTP API server started on {} (endpoints under '{}')",
            bind_address,
            self.state.config.base_path()
        );
        Ok(())
    }

    pub async fn stop(&mut self) {
        info!("🛑 Stopping HTTP API server...");

        if let Some(handle) = self.server_handle.take() {
            // Use graceful shutdown with timeout
            tokio::select! {
                _ = handle.stop(true) => {
                    info!("✅ HTTP API server stopped gracefully");
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(10)) => {
                    warn!("⚠️  HTTP API server shutdown timeout, forcing stop");
                    handle.stop(false).await;
                }
            }
        }
    }
}

/// Mounts the gateway endpoints under the configured base path.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &ApiServiceState) {
    let json_config = web::JsonConfig::default()
        .limit(state.config.api.json_limit_bytes)
        .error_handler(json_error_handler);

    cfg.app_data(web::Data::new(state.clone()))
        .app_data(json_config)
        .service(
            web::scope(state.config.base_path())
                .route("/health", web::get().to(health_check))
                .route("/tcp/read", web::post().to(tcp_read))
                .route("/tcp/write", web::post().to(tcp_write)),
        );
}

// API Endpoints

// POST {base}/tcp/read - Read a range of points from a device
async fn tcp_read(
    body: web::Json<Value>,
    state: web::Data<ApiServiceState>,
) -> ActixResult<HttpResponse> {
    match state.gateway.read_json(&body).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => Ok(error_response(&e)),
    }
}

// POST {base}/tcp/write - Write coils or holding registers
async fn tcp_write(
    body: web::Json<Value>,
    state: web::Data<ApiServiceState>,
) -> ActixResult<HttpResponse> {
    match state.gateway.write_json(&body).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => Ok(error_response(&e)),
    }
}

// GET {base}/health - Health check
async fn health_check(state: web::Data<ApiServiceState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "timestamp": Utc::now(),
        "version": crate::VERSION
    })))
}

fn error_response(err: &GatewayError) -> HttpResponse {
    let body = ErrorResponse::from_gateway_error(err);
    if err.is_client_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::BadGateway().json(body)
    }
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("❌ Rejected body on {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        success: false,
        error: format!("Malformed JSON body: {}", err),
        code: "VALIDATION_ERROR".to_string(),
        field: Some("body".to_string()),
        timestamp: Utc::now(),
    });
    InternalError::from_response(err, response).into()
}
