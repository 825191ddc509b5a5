//! Subscriber setup and the per-request logging middleware.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
static FILE_LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
static LOGGING_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format `{other}` (expected json or pretty)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub include_target: bool,
    /// Optional JSON-lines copy of every event, e.g. `logs/api.jsonl`.
    pub json_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            include_target: false,
            json_file: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_target(mut self, include_target: bool) -> Self {
        self.include_target = include_target;
        self
    }

    pub fn with_json_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_file = Some(path.into());
        self
    }
}

/// Request id attached to request extensions by [`request_logging_middleware`].
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Installs the global subscriber. `RUST_LOG` drives the filter (default
/// `info`). Only the first successful call in a process has any effect; later
/// calls return before opening log files.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    if LOGGING_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    install_subscriber(config).inspect_err(|_| LOGGING_INSTALLED.store(false, Ordering::SeqCst))
}

fn install_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (
            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.include_target),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.include_target),
            ),
        ),
    };

    let file = match &config.json_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(config.include_target)
                .with_writer(file_writer(path)?),
        ),
        None => None,
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init();

    if let Err(err) = result {
        // Tests and embedding binaries may have installed a subscriber already.
        if err.to_string().contains("already been set") {
            return Ok(());
        }
        return Err(Box::new(err));
    }

    info!(format = ?config.format, "Logging initialized");
    Ok(())
}

fn file_writer(
    path: &Path,
) -> Result<tracing_appender::non_blocking::NonBlocking, Box<dyn std::error::Error>> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log file path {} has no file name", path.display()),
        )
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_LOG_GUARD.set(guard);
    Ok(writer)
}

fn accept_request_id(candidate: Option<&str>) -> Option<String> {
    let trimmed = candidate?.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_REQUEST_ID_LEN
        && trimmed
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b':'));

    valid.then(|| trimmed.to_string())
}

/// Logs one line when a request starts and one when it ends, leveled by the
/// response status class. Propagates or assigns `x-request-id`.
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let request_id = accept_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    )
    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    debug!(request_id = %request_id, method = %method, path = %path, "Request started");

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    if status.is_server_error() {
        error!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms, "Request rejected");
    } else {
        info!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    async fn echo_request_id(request: Request) -> String {
        request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default()
    }

    async fn call(header: Option<&str>) -> (String, String) {
        let app = Router::new()
            .route("/", get(echo_request_id))
            .layer(middleware::from_fn(request_logging_middleware));

        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        (header, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn assigns_request_id_when_missing() {
        let (header, seen_by_handler) = call(None).await;
        assert!(!header.is_empty());
        assert_eq!(header, seen_by_handler);
    }

    #[tokio::test]
    async fn keeps_well_formed_request_id() {
        let (header, seen_by_handler) = call(Some("listing-42")).await;
        assert_eq!(header, "listing-42");
        assert_eq!(seen_by_handler, "listing-42");
    }

    #[tokio::test]
    async fn replaces_malformed_request_id() {
        let (header, _) = call(Some("spaces are not allowed")).await;
        assert_ne!(header, "spaces are not allowed");
        assert!(!header.is_empty());
    }

    #[test]
    fn later_calls_do_not_open_another_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = LoggingConfig::default().with_json_file(dir.path().join("first/api.jsonl"));
        let second = LoggingConfig::default().with_json_file(dir.path().join("second/api.jsonl"));

        init_logging(&first).unwrap();
        init_logging(&second).unwrap();

        assert!(!dir.path().join("second").exists());
    }

    #[test]
    fn parses_log_format() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
