use site_http::{
    AppConfig, ConfigError, CorsPolicy, DEFAULT_BODY_LIMIT, LogFormat, LoggingConfig,
    ServerConfig,
};
use std::path::PathBuf;

const MIB: usize = 1024 * 1024;

/// Runtime settings read from the environment (and `.env`, loaded in `main`).
#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) data_dir: PathBuf,
    pub(crate) log_format: LogFormat,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) body_limit: usize,
    pub(crate) cors: CorsPolicy,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            data_dir: PathBuf::from("./data"),
            log_format: LogFormat::Pretty,
            log_file: None,
            body_limit: DEFAULT_BODY_LIMIT,
            cors: CorsPolicy::Permissive,
        }
    }
}

impl ApiSettings {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut settings = Self::default();

        if let Some(host) = read("HOST") {
            settings.host = host;
        }
        if let Some(port) = read("PORT") {
            settings.port = port.parse().map_err(|_| invalid("PORT", port))?;
        }
        if let Some(dir) = read("DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(format) = read("LOG_FORMAT") {
            settings.log_format = format.parse().map_err(|_| invalid("LOG_FORMAT", format))?;
        }
        settings.log_file = read("LOG_FILE").map(PathBuf::from);
        if let Some(limit) = read("BODY_LIMIT_MB") {
            settings.body_limit = limit
                .parse::<usize>()
                .ok()
                .filter(|mb| *mb > 0)
                .and_then(|mb| mb.checked_mul(MIB))
                .ok_or_else(|| invalid("BODY_LIMIT_MB", limit))?;
        }
        if let Some(origins) = read("CORS_ALLOWED_ORIGINS") {
            settings.cors = CorsPolicy::from_origin_list(&origins);
        }

        settings.server_config().validate()?;
        settings.cors.validate()?;
        Ok(settings)
    }

    pub(crate) fn properties_file(&self) -> PathBuf {
        self.data_dir.join("properties.json")
    }

    pub(crate) fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub(crate) fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.port).with_host(self.host.clone())
    }

    pub(crate) fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default().with_format(self.log_format);
        match &self.log_file {
            Some(path) => config.with_json_file(path.clone()),
            None => config,
        }
    }

    pub(crate) fn app_config(&self) -> AppConfig {
        AppConfig::new()
            .with_logging(true)
            .with_tracing(true)
            .with_cors(self.cors.clone())
            .with_body_limit(self.body_limit)
            .with_logging_config(self.logging_config())
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { name, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<ApiSettings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ApiSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.server_config().address().unwrap().to_string(), "0.0.0.0:3001");
        assert_eq!(settings.properties_file(), PathBuf::from("./data/properties.json"));
        assert_eq!(settings.uploads_dir(), PathBuf::from("./data/uploads"));
        assert_eq!(settings.body_limit, 50 * MIB);
        assert!(matches!(settings.cors, CorsPolicy::Permissive));
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn reads_overrides() {
        let settings = settings(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATA_DIR", "/srv/gonzalez"),
            ("LOG_FORMAT", "json"),
            ("LOG_FILE", "logs/api.jsonl"),
            ("BODY_LIMIT_MB", "5"),
            ("CORS_ALLOWED_ORIGINS", "https://inmobiliariagonzalez.com.ar"),
        ])
        .unwrap();

        assert_eq!(settings.server_config().address().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(settings.uploads_dir(), PathBuf::from("/srv/gonzalez/uploads"));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(
            settings.logging_config().json_file,
            Some(PathBuf::from("logs/api.jsonl"))
        );
        assert_eq!(settings.app_config().body_limit, 5 * MIB);
        assert!(matches!(settings.cors, CorsPolicy::Origins(ref origins) if origins.len() == 1));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings = settings(&[("PORT", "  "), ("LOG_FILE", "")]).unwrap();

        assert_eq!(settings.port, 3001);
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (key, value) in [
            ("PORT", "http"),
            ("LOG_FORMAT", "xml"),
            ("BODY_LIMIT_MB", "0"),
        ] {
            match settings(&[(key, value)]) {
                Err(ConfigError::InvalidValue { name, .. }) => assert_eq!(name, key),
                other => panic!("{key}={value} should be rejected, got {other:?}"),
            }
        }

        assert!(matches!(
            settings(&[("PORT", "0")]),
            Err(ConfigError::InvalidPort { port: 0 })
        ));
        assert!(matches!(
            settings(&[("CORS_ALLOWED_ORIGINS", "ftp://files.example")]),
            Err(ConfigError::InvalidCors(_))
        ));
    }
}
