//! `site-http` is the axum scaffold shared by the client site backends.
//!
//! - bootstrap: `ServerConfig`, `AppConfig`, `AppBuilder`, `Server`
//! - logging: `tracing` subscriber setup and request-id aware request logs
//! - CORS policy, `{error}` bodies and the `{status, timestamp}` health check

pub mod core;

pub use core::{
    AppBuilder, AppConfig, ConfigError, CorsPolicy, DEFAULT_BODY_LIMIT, ErrorBody,
    HealthResponse, LogFormat, LoggingConfig, REQUEST_ID_HEADER, RequestId, Server, ServerConfig,
    health_check, init_logging, request_logging_middleware,
};
