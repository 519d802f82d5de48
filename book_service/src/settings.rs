use anyhow::Context;
use serde::Deserialize;

const CONFIG_FILE_ENV: &str = "BOOKSERVICE_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "bookservice.toml";
const ENV_PREFIX: &str = "BOOKSERVICE";

/// Service configuration: optional TOML file overlaid with `BOOKSERVICE_*` environment
/// variables, nested keys separated by `__` (e.g. `BOOKSERVICE_DATABASE__HOSTNAME`)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub in_memory: bool,
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            in_memory: false,
            hostname: "127.0.0.1".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub keycloak_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub required_role: String,
    /// When set, this token is accepted as a book manager and Keycloak is not contacted
    pub dev_token: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            keycloak_url: "http://localhost:8080".to_string(),
            realm: "company-services".to_string(),
            client_id: "book-service".to_string(),
            client_secret: String::new(),
            required_role: crate::auth::MANAGE_BOOKS.to_string(),
            dev_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub service_name: String,
    /// Used when `RUST_LOG` is not set
    pub log_filter: String,
    pub jaeger_enabled: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: "book_service".to_string(),
            log_filter: "info".to_string(),
            jaeger_enabled: false,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(config::File::with_name(&config_file).required(false))
    }

    fn load_from<S>(file_source: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
