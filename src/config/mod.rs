//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file and then overridden by
//! `DEVNEST_*` environment variables. Missing optional values are filled with
//! sensible defaults, so an absent file is a valid (development) setup.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token issuance configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// OAuth providers
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Outgoing mail
    #[serde(default)]
    pub smtp: SmtpConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/devnest.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// JWT and account-link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens. Left empty, a random
    /// per-process secret is generated at load time.
    #[serde(default)]
    pub jwt_secret: String,
    /// Token lifetime in hours
    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: i64,
    /// Base URL of the web client, used in emailed links
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiration_hours: default_jwt_expiration_hours(),
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_jwt_expiration_hours() -> i64 {
    24
}

impl AuthConfig {
    /// Replace a blank `jwt_secret` with a random one. Returns `true` when a
    /// secret was generated.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if !self.jwt_secret.trim().is_empty() {
            return false;
        }
        self.jwt_secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        true
    }
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

/// OAuth provider credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub github: OAuthProviderConfig,
    #[serde(default)]
    pub google: OAuthProviderConfig,
}

/// Credentials for a single OAuth provider.
///
/// A provider with an empty `client_id` is treated as disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_url: String,
}

impl OAuthProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// SMTP configuration.
///
/// When `host` is empty, outgoing mail is written to the log instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: default_smtp_from(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "DevNest <no-reply@devnest.local>".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `DEVNEST_<SECTION>_<KEY>`,
    /// e.g. `DEVNEST_SERVER_PORT` or `DEVNEST_OAUTH_GITHUB_CLIENT_ID`.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        if config.auth.ensure_jwt_secret() {
            tracing::warn!(
                "auth.jwt_secret is not set, using a random secret; issued tokens will not survive a restart"
            );
        }
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        // Server
        override_string("DEVNEST_SERVER_HOST", &mut self.server.host);
        override_parsed("DEVNEST_SERVER_PORT", &mut self.server.port);
        override_string("DEVNEST_SERVER_CORS_ORIGIN", &mut self.server.cors_origin);

        // Database
        override_string("DEVNEST_DATABASE_URL", &mut self.database.url);
        override_parsed(
            "DEVNEST_DATABASE_MAX_CONNECTIONS",
            &mut self.database.max_connections,
        );

        // Auth
        override_string("DEVNEST_AUTH_JWT_SECRET", &mut self.auth.jwt_secret);
        override_parsed(
            "DEVNEST_AUTH_JWT_EXPIRATION_HOURS",
            &mut self.auth.jwt_expiration_hours,
        );
        override_string("DEVNEST_AUTH_FRONTEND_URL", &mut self.auth.frontend_url);

        // OAuth
        override_provider("GITHUB", &mut self.oauth.github);
        override_provider("GOOGLE", &mut self.oauth.google);

        // SMTP
        override_string("DEVNEST_SMTP_HOST", &mut self.smtp.host);
        override_parsed("DEVNEST_SMTP_PORT", &mut self.smtp.port);
        override_string("DEVNEST_SMTP_USERNAME", &mut self.smtp.username);
        override_string("DEVNEST_SMTP_PASSWORD", &mut self.smtp.password);
        override_string("DEVNEST_SMTP_FROM", &mut self.smtp.from);
    }
}

fn override_string(key: &str, target: &mut String) {
    if let Ok(value) = std::env::var(key) {
        *target = value;
    }
}

/// Unparseable values are ignored and the previous value is kept.
fn override_parsed<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = std::env::var(key) {
        if let Ok(parsed) = value.parse::<T>() {
            *target = parsed;
        }
    }
}

fn override_provider(name: &str, provider: &mut OAuthProviderConfig) {
    override_string(
        &format!("DEVNEST_OAUTH_{}_CLIENT_ID", name),
        &mut provider.client_id,
    );
    override_string(
        &format!("DEVNEST_OAUTH_{}_CLIENT_SECRET", name),
        &mut provider.client_secret,
    );
    override_string(
        &format!("DEVNEST_OAUTH_{}_REDIRECT_URL", name),
        &mut provider.redirect_url,
    );
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
