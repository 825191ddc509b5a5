//! CORS policy for the site backends.
//!
//! The static sites are served from their own domains and call the API from
//! the browser, so the default is fully permissive. Deployments that know
//! their origins can pin them with `CORS_ALLOWED_ORIGINS`.

use crate::core::server::ConfigError;
use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86400);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin, any header.
    #[default]
    Permissive,
    /// Only the listed origins, e.g. `https://inmobiliariagonzalez.com.ar`.
    Origins(Vec<String>),
}

impl CorsPolicy {
    /// Parses a comma separated origin list. Empty input or `*` means
    /// permissive.
    pub fn from_origin_list(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            Self::Permissive
        } else {
            Self::Origins(origins)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self::Origins(origins) = self else {
            return Ok(());
        };

        if origins.is_empty() {
            return Err(ConfigError::InvalidCors("origin list is empty".to_string()));
        }

        for origin in origins {
            let looks_like_origin =
                origin.starts_with("http://") || origin.starts_with("https://");
            if !looks_like_origin || HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidCors(format!(
                    "`{origin}` is not an http(s) origin"
                )));
            }
        }

        Ok(())
    }

    pub fn build_layer(&self) -> CorsLayer {
        let methods = [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ];

        match self {
            Self::Permissive => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(methods)
                .allow_headers(Any)
                .max_age(PREFLIGHT_MAX_AGE),
            Self::Origins(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| HeaderValue::from_str(origin).ok())
                    .collect();

                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(methods)
                    .allow_headers([
                        HeaderName::from_static("content-type"),
                        HeaderName::from_static("x-requested-with"),
                        HeaderName::from_static("x-request-id"),
                    ])
                    .expose_headers([HeaderName::from_static("x-request-id")])
                    .max_age(PREFLIGHT_MAX_AGE)
            }
        }
    }
}
