use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub event: EventConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Session-token validation settings. Tokens are minted by the external
/// identity provider; this service only verifies them with the shared secret.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    #[serde(default)]
    pub previous_secrets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    #[serde(default = "default_ticket_ttl")]
    pub ticket_ttl_minutes: u64,
}

/// The gallery opens at `starts_at` (RFC3339). Before that instant every
/// gated route redirects to `landing_path`; afterwards only signed-out
/// visitors are redirected.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_event_starts_at")]
    pub starts_at: String,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4700
}

fn default_db_path() -> String {
    "data/gala.db".to_string()
}

fn default_session_secret() -> String {
    // Generate a random secret if not configured
    "change-this-shared-session-secret".to_string()
}

fn default_local_path() -> String {
    "data/media".to_string()
}

fn default_max_upload_mb() -> u64 {
    200
}

fn default_ticket_ttl() -> u64 {
    60 // minutes
}

fn default_event_starts_at() -> String {
    // Epoch means the gallery is open from the start
    "1970-01-01T00:00:00Z".to_string()
}

fn default_landing_path() -> String {
    "/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: default_session_secret(),
            previous_secrets: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
            max_upload_mb: default_max_upload_mb(),
            ticket_ttl_minutes: default_ticket_ttl(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            starts_at: default_event_starts_at(),
            landing_path: default_landing_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            event: EventConfig::default(),
        }
    }
}

impl EventConfig {
    /// Parsed gate instant. An unparseable value degrades to the epoch so a
    /// bad config opens the gallery instead of locking everyone out.
    pub fn starts_at_utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.starts_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_session_secret()?;
        if DateTime::parse_from_rfc3339(&config.event.starts_at).is_err() {
            tracing::warn!(
                "Invalid event.starts_at '{}', treating the gallery as already open",
                config.event.starts_at
            );
        }
        tracing::info!(
            "Event gate: starts_at={}, landing_path={}",
            config.event.starts_at,
            config.event.landing_path
        );
        Ok(config)
    }

    /// Ensure the session secret is non-default and persisted
    fn ensure_session_secret(&mut self) -> anyhow::Result<()> {
        // If secret is the default one or empty
        if self.auth.session_secret == default_session_secret() || self.auth.session_secret.is_empty() {
            let secret_path = Path::new("data/.session_secret");

            if secret_path.exists() {
                // Load existing secret
                let secret = fs::read_to_string(secret_path)?;
                self.auth.session_secret = secret.trim().to_string();
                tracing::info!("Loaded persisted session secret from data/.session_secret");
            } else {
                // Generate new strong secret
                let secret = uuid::Uuid::new_v4().to_string();

                // Ensure data directory exists
                if let Some(parent) = secret_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                // Save to file
                fs::write(secret_path, &secret)?;
                self.auth.session_secret = secret;
                tracing::info!("Generated and persisted new session secret to data/.session_secret");
            }
        }
        Ok(())
    }

    /// Load configuration from conf.ini or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.ini", "config.toml", "data/conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: GALA_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("GALA_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("GALA_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("GALA_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Auth overrides
        if let Ok(val) = env::var("GALA_CONF_AUTH_SECRET") {
            self.auth.session_secret = val;
        }
        if let Ok(val) = env::var("GALA_CONF_AUTH_PREVIOUS_SECRETS") {
            self.auth.previous_secrets = val
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }

        // Storage overrides
        if let Ok(val) = env::var("GALA_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("GALA_CONF_STORAGE_MAX_UPLOAD_MB") {
            if let Ok(mb) = val.parse() {
                self.storage.max_upload_mb = mb;
            }
        }
        if let Ok(val) = env::var("GALA_CONF_STORAGE_TICKET_TTL_MINUTES") {
            if let Ok(minutes) = val.parse() {
                self.storage.ticket_ttl_minutes = minutes;
            }
        }

        // Event overrides
        if let Ok(val) = env::var("GALA_CONF_EVENT_STARTS_AT") {
            if !val.trim().is_empty() {
                self.event.starts_at = val;
            }
        }
        if let Ok(val) = env::var("GALA_CONF_EVENT_LANDING_PATH") {
            if !val.trim().is_empty() {
                self.event.landing_path = val;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        // Ensure database directory exists
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        // Ensure local media directory exists
        fs::create_dir_all(&self.storage.local_path)?;

        Ok(())
    }
}
