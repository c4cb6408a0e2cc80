//! Layered configuration: compiled defaults, `./meetme.toml`, then `MEETME_*`
//! environment variables.

use std::{fmt, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::store::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Rejects signing keys anyone could know. The built-in `jwt_secret` is
    /// tolerated only with the memory backend.
    pub fn check_secrets(&self) -> Result<(), String> {
        if self.auth.jwt_secret.is_empty() {
            return Err("auth.jwt_secret must not be empty".to_string());
        }
        if self.store.backend == StoreBackend::Surreal && self.auth.jwt_secret == default_jwt_secret() {
            return Err(
                "auth.jwt_secret is the built-in default, set MEETME_AUTH_JWT_SECRET".to_string(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3016
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Key used to sign and verify desk credentials.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: String,
    /// Key the identity provider signs its tokens with.
    #[serde(default)]
    pub oauth_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: default_issuer(),
            token_ttl_hours: default_token_ttl_hours(),
            admin_email: default_admin_email(),
            admin_password: String::new(),
            oauth_secret: String::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"[redacted]")
            .field("oauth_secret", &"[redacted]")
            .finish()
    }
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_issuer() -> String {
    "meetme-desk".to_string()
}

fn default_token_ttl_hours() -> u64 {
    24 * 7
}

fn default_admin_email() -> String {
    "admin@meetme.local".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Surreal,
    Memory,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_namespace")]
    pub database: String,
    #[serde(default = "default_store_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl StoreConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_store_url(),
            namespace: default_namespace(),
            database: default_namespace(),
            username: default_store_username(),
            password: String::new(),
            timeout_ms: default_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Surreal
}

fn default_store_url() -> String {
    "localhost:8050".to_string()
}

fn default_namespace() -> String {
    "meetme".to_string()
}

fn default_store_username() -> String {
    "root".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_retry_delay_ms() -> u64 {
    100
}

pub fn load_config() -> Result<AppConfig, figment::Error> {
    load_config_from_path(Path::new("meetme.toml"))
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

pub fn load_config_from_str(toml_content: &str) -> Result<AppConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `MEETME_AUTH_JWT_SECRET` -> `auth.jwt_secret`. Only the section prefix is
/// rewritten, so underscores inside key names survive.
fn env_provider() -> Env {
    Env::prefixed("MEETME_").map(|key| {
        key.as_str()
            .replacen("server_", "server.", 1)
            .replacen("auth_", "auth.", 1)
            .replacen("store_", "store.", 1)
            .into()
    })
}
