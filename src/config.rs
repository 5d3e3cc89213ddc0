//! Configuration manager for userbase.

use std::fs::File;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const TEST_ENVIRONMENT: &str = "test";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public base URL, used to build `Location` headers.
    pub url: String,
    /// Runtime environment (`development`, `production`, `test`...).
    pub environment: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
    /// Seconds before a request is answered with 408.
    pub timeout_secs: u64,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to MongoDB configuration.
    #[serde(skip_serializing)]
    pub mongodb: Option<Mongo>,
    /// Related to request rate limiting.
    pub rate_limit: RateLimit,
    /// Related to metrics and OTLP export.
    #[serde(skip_serializing)]
    pub telemetry: Telemetry,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            url: String::default(),
            environment: "development".to_owned(),
            port: 3000,
            body_limit: 10 * 1024 * 1024, // 10 MiB.
            timeout_secs: 10,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            mongodb: None,
            rate_limit: RateLimit::default(),
            telemetry: Telemetry::default(),
        }
    }
}

/// MongoDB configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Mongo {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Connection string used when `environment` is `test`.
    pub test_uri: Option<String>,
    /// Database name. Default is the one in the connection string.
    pub database: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

impl Mongo {
    /// Connection string to use for `environment`.
    pub fn connection_string(&self, environment: &str) -> &str {
        match &self.test_uri {
            Some(uri) if environment == TEST_ENVIRONMENT => uri,
            _ => &self.uri,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    /// Requests allowed per client inside a window.
    pub max_requests: usize,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Peers whose `X-Forwarded-For` header is honoured.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default)]
    pub prometheus: bool,
    /// gRPC OTLP endpoint for logs and traces.
    pub otlp_endpoint: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Whether the service runs under the test environment.
    pub fn is_test(&self) -> bool {
        self.environment == TEST_ENVIRONMENT
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let mut config = match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        config.apply_env(|key| std::env::var(key).ok());

        // set app version.
        config.version = VERSION.to_owned();

        // normalize URLs.
        if !config.url.is_empty() {
            config.url = self.normalize_url(&config.url)?;
        }

        Ok(Arc::new(config))
    }

    /// Override values with the ones found in environment.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(environment) = var("APP_ENV") {
            self.environment = environment;
        }

        let uri = var("MONGODB_URI");
        let test_uri = var("MONGODB_URI_TEST");
        let database = var("MONGODB_DATABASE");
        if uri.is_some() || test_uri.is_some() || database.is_some() {
            let mongo = self.mongodb.get_or_insert_with(Mongo::default);
            if let Some(uri) = uri {
                mongo.uri = uri;
            }
            if test_uri.is_some() {
                mongo.test_uri = test_uri;
            }
            if database.is_some() {
                mongo.database = database;
            }
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
