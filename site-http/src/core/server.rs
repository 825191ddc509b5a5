//! Server bootstrap and runtime configuration.
//!
//! Startup goes through a single path:
//! `AppBuilder -> Server::new(...) -> Server::start()`.

use crate::core::{
    app::AppBuilder,
    cors::CorsPolicy,
    logging::{LoggingConfig, init_logging, request_logging_middleware},
};
use axum::{Router, extract::DefaultBodyLimit, middleware};
use std::net::SocketAddr;
use tracing::{error, info};

/// Request body cap when nothing else is configured. Property payloads carry
/// inline base64 images.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Listener address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Middleware and runtime switches applied around the routes.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub enable_logging: bool,
    pub enable_tracing: bool,
    pub cors: Option<CorsPolicy>,
    pub body_limit: usize,
    pub logging_config: LoggingConfig,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            ConfigError::InvalidSocketAddress {
                host: self.host.clone(),
                port: self.port,
            }
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Port 0 would let the OS pick a random port; the sites need a fixed one.
        if self.port == 0 {
            return Err(ConfigError::InvalidPort { port: self.port });
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        self.address()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(3001)
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }

    pub fn with_cors(mut self, policy: CorsPolicy) -> Self {
        self.cors = Some(policy);
        self
    }

    pub fn without_cors(mut self) -> Self {
        self.cors = None;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn with_logging_config(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.body_limit == 0 {
            return Err(ConfigError::InvalidBodyLimit);
        }

        if let Some(policy) = &self.cors {
            policy.validate()?;
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            enable_tracing: true,
            cors: Some(CorsPolicy::Permissive),
            body_limit: DEFAULT_BODY_LIMIT,
            logging_config: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid port {port}: a fixed port between 1 and 65535 is required")]
    InvalidPort { port: u16 },
    #[error("empty host address")]
    EmptyHost,
    #[error("invalid socket address: {host}:{port}")]
    InvalidSocketAddress { host: String, port: u16 },
    #[error("request body limit must be greater than zero")]
    InvalidBodyLimit,
    #[error("invalid CORS configuration: {0}")]
    InvalidCors(String),
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

pub struct Server {
    server_config: ServerConfig,
    app_builder: AppBuilder,
}

impl Server {
    pub fn new(server_config: ServerConfig, app_builder: AppBuilder) -> Self {
        Self {
            server_config,
            app_builder,
        }
    }

    /// Finished router with every runtime layer applied, without binding a
    /// socket or touching the global subscriber.
    pub fn into_router(self) -> Router {
        let (router, app_config, _) = self.app_builder.into_parts();
        apply_app_layers(router, &app_config)
    }

    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        let (router, app_config, endpoints) = self.app_builder.into_parts();

        if app_config.enable_logging {
            init_logging(&app_config.logging_config)?;
        }

        self.server_config
            .validate()
            .map_err(|e| format!("invalid server configuration: {e}"))?;
        app_config
            .validate()
            .map_err(|e| format!("invalid app configuration: {e}"))?;

        let app = apply_app_layers(router, &app_config);
        let addr = self.server_config.address()?;

        info!(
            host = %self.server_config.host,
            port = self.server_config.port,
            cors_enabled = app_config.cors.is_some(),
            body_limit = app_config.body_limit,
            "Server starting on http://{addr}"
        );
        for endpoint in &endpoints {
            info!(endpoint = %endpoint, "Mounted");
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("Server stopped");
        Ok(())
    }
}

fn apply_app_layers(mut router: Router, config: &AppConfig) -> Router {
    router = router.layer(DefaultBodyLimit::max(config.body_limit));

    if config.enable_logging {
        router = router.layer(middleware::from_fn(request_logging_middleware));
    }

    if config.enable_tracing {
        router = router.layer(tower_http::trace::TraceLayer::new_for_http());
    }

    if let Some(policy) = &config.cors {
        router = router.layer(policy.build_layer());
    }

    router
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM signal handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };

    info!(signal, "Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_port_zero_and_blank_host() {
        assert!(matches!(
            ServerConfig::new(0).validate(),
            Err(ConfigError::InvalidPort { port: 0 })
        ));
        assert!(matches!(
            ServerConfig::new(3001).with_host("  ").validate(),
            Err(ConfigError::EmptyHost)
        ));
    }

    #[test]
    fn rejects_unparseable_host() {
        let err = ServerConfig::new(3001)
            .with_host("not a host")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSocketAddress { .. }));
    }

    #[test]
    fn default_listens_on_all_interfaces() {
        let addr = ServerConfig::default().address().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn zero_body_limit_is_invalid() {
        let err = AppConfig::new().with_body_limit(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBodyLimit));
    }
}
