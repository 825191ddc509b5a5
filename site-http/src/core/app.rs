//! Application router builder.
//!
//! `AppBuilder` only composes routes. Logging, tracing, CORS and the body
//! limit are layered on later by `Server`.

use crate::core::{response::ErrorBody, server::AppConfig};
use axum::{Router, http::StatusCode, response::Response};
use std::path::Path;
use tower_http::services::ServeDir;

pub struct AppBuilder {
    router: Router,
    app_config: AppConfig,
    known_endpoints: Vec<String>,
}

impl AppBuilder {
    pub fn new(app_config: AppConfig) -> Self {
        Self {
            router: Router::new(),
            app_config,
            known_endpoints: Vec::new(),
        }
    }

    pub fn route(mut self, path: &str, method: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, method);
        self.known_endpoints.push(path.to_string());
        self
    }

    pub fn nest(mut self, path: &str, router: Router) -> Self {
        self.router = self.router.nest(path, router);
        self.known_endpoints.push(format!("{path}/*"));
        self
    }

    /// Serves the files of `dir` read-only under `path`.
    pub fn serve_dir(mut self, path: &str, dir: impl AsRef<Path>) -> Self {
        self.router = self
            .router
            .nest_service(path, ServeDir::new(dir.as_ref()));
        self.known_endpoints.push(format!("{path}/*"));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.app_config
    }

    pub(crate) fn into_parts(self) -> (Router, AppConfig, Vec<String>) {
        let mut endpoints = self.known_endpoints;
        endpoints.sort();
        endpoints.dedup();

        (
            self.router.fallback(fallback_handler),
            self.app_config,
            endpoints,
        )
    }
}

async fn fallback_handler() -> Response {
    ErrorBody::new("Not found").with_status(StatusCode::NOT_FOUND)
}
