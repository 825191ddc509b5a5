pub mod app;
pub mod cors;
pub mod health;
pub mod logging;
pub mod response;
pub mod server;

pub use app::AppBuilder;
pub use cors::CorsPolicy;
pub use health::health_check;
pub use logging::{
    LogFormat, LoggingConfig, REQUEST_ID_HEADER, RequestId, init_logging,
    request_logging_middleware,
};
pub use response::{ErrorBody, HealthResponse};
pub use server::{AppConfig, ConfigError, DEFAULT_BODY_LIMIT, Server, ServerConfig};
