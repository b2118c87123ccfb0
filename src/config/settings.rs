use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Shared secret expected in `X-API-Key`. Unset disables the check.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Base URL deep links are built on
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Message time-to-live handed to the push service, in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_icon")]
    pub badge: String,
    /// Push gateway that signs (VAPID) and encrypts messages for the push services
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Upper bound on recipients processed at the same time within one batch
    #[serde(default = "default_max_concurrent_recipients")]
    pub max_concurrent_recipients: usize,
    /// Bearer token presented to the gateway
    pub gateway_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_directory_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

/// OpenTelemetry exporter settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ttl_seconds() -> u64 {
    86_400 // 24 hours
}

fn default_icon() -> String {
    "/favicon.svg".to_string()
}

fn default_gateway_url() -> String {
    "http://localhost:8090/send".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_concurrent_recipients() -> usize {
    16
}

fn default_directory_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/push".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "push-fanout-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Flat environment variable names and the keys they set.
const ENV_KEYS: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("API_KEY", "api.key"),
    ("PUSH_APP_URL", "push.app_url"),
    ("PUSH_TTL_SECONDS", "push.ttl_seconds"),
    ("PUSH_ICON", "push.icon"),
    ("PUSH_BADGE", "push.badge"),
    ("PUSH_GATEWAY_URL", "push.gateway_url"),
    ("PUSH_GATEWAY_TOKEN", "push.gateway_token"),
    ("PUSH_REQUEST_TIMEOUT_SECONDS", "push.request_timeout_seconds"),
    ("PUSH_MAX_CONCURRENT_RECIPIENTS", "push.max_concurrent_recipients"),
    ("DIRECTORY_BACKEND", "directory.backend"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_POOL_SIZE", "database.pool_size"),
    ("DATABASE_CONNECT_TIMEOUT_SECONDS", "database.connect_timeout_seconds"),
    ("DATABASE_IDLE_TIMEOUT_SECONDS", "database.idle_timeout_seconds"),
    ("OTEL_ENABLED", "otel.enabled"),
    ("OTEL_ENDPOINT", "otel.endpoint"),
    ("OTEL_SERVICE_NAME", "otel.service_name"),
    ("OTEL_SAMPLING_RATIO", "otel.sampling_ratio"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        Self::load("config", env::vars())
    }

    /// Layers built-in defaults, `{config_dir}/default`, `{config_dir}/{RUN_MODE}`
    /// and finally the given environment variables.
    ///
    /// Known flat names (`PUSH_APP_URL`, `DATABASE_URL`, ...) map through
    /// `ENV_KEYS`; any other field can be reached with a double underscore
    /// path such as `PUSH__ICON`. Values are never split into lists.
    pub fn load<I>(config_dir: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Map<String, String> = vars.into_iter().collect();
        let run_mode = vars
            .get("RUN_MODE")
            .cloned()
            .unwrap_or_else(|| "development".into());

        let nested: Map<String, String> = vars
            .iter()
            .filter(|(name, _)| name.contains("__"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("push.ttl_seconds", 86_400)?
            .set_default("directory.backend", "memory")?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false),
            )
            .add_source(Environment::default().separator("__").source(Some(nested)));

        for (name, key) in ENV_KEYS {
            builder = builder.set_override_option(*key, vars.get(*name).cloned())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PushConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            ttl_seconds: default_ttl_seconds(),
            icon: default_icon(),
            badge: default_icon(),
            gateway_url: default_gateway_url(),
            request_timeout_seconds: default_request_timeout(),
            max_concurrent_recipients: default_max_concurrent_recipients(),
            gateway_token: None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: default_directory_backend(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            push: PushConfig::default(),
            directory: DirectoryConfig::default(),
            database: DatabaseConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}
