//! Application configuration for Mocktailverse.
//!
//! User config lives at `~/.mocktailverse/mocktailverse.toml`.
//! Environment variables override config file values, and CLI flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MocktailverseError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mocktailverse.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mocktailverse";

/// Env var selecting the executor mode.
pub const EXECUTOR_ENV: &str = "MOCKTAILVERSE_EXECUTOR";

/// Env var toggling registration of the bundled example pipeline.
pub const LOAD_EXAMPLES_ENV: &str = "MOCKTAILVERSE_LOAD_EXAMPLES";

/// Env var overriding the data directory.
pub const DATA_DIR_ENV: &str = "MOCKTAILVERSE_DATA_DIR";

// ---------------------------------------------------------------------------
// Config structs (matching mocktailverse.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Cocktail API source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Object store bucket names.
    #[serde(default)]
    pub buckets: BucketsConfig,

    /// Cloud region and credential env var names.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Retry policy for transient stage failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Web process settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for the object store and the database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.mocktailverse/data".into()
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the cocktail API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// First letters to query (`search.php?f=<letter>`).
    #[serde(default = "default_letters")]
    pub letters: String,

    /// Maximum concurrent API requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            letters: default_letters(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://www.thecocktaildb.com/api/json/v1/1".into()
}
fn default_letters() -> String {
    "abcdefghijklmnopqrstuvwxyz".into()
}
fn default_concurrency() -> u32 {
    4
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[buckets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketsConfig {
    /// Landing zone for raw extracts.
    #[serde(default = "default_raw_bucket")]
    pub raw: String,

    /// Transformed, enriched and modeled outputs.
    #[serde(default = "default_processed_bucket")]
    pub processed: String,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_bucket(),
            processed: default_processed_bucket(),
        }
    }
}

fn default_raw_bucket() -> String {
    "mocktailverse-raw-data".into()
}
fn default_processed_bucket() -> String {
    "mocktailverse-processed-data".into()
}

/// `[cloud]` section. Only env var *names* are stored, never secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_region_env")]
    pub region_env: String,

    /// Region used when the region env var is unset.
    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,

    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            region_env: default_region_env(),
            default_region: default_region(),
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

fn default_region_env() -> String {
    "AWS_DEFAULT_REGION".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_access_key_env() -> String {
    "AWS_ACCESS_KEY_ID".into()
}
fn default_secret_key_env() -> String {
    "AWS_SECRET_ACCESS_KEY".into()
}

/// How stages schedule their internal work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorMode {
    /// Everything on one task; extract concurrency is forced to 1.
    Sequential,
    /// Extract fans out up to `source.concurrency` requests.
    Local,
}

impl std::str::FromStr for ExecutorMode {
    type Err = MocktailverseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "sequentialexecutor" => Ok(Self::Sequential),
            "local" | "localexecutor" => Ok(Self::Local),
            other => Err(MocktailverseError::config(format!(
                "unknown executor '{other}': expected 'sequential' or 'local'"
            ))),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_executor")]
    pub executor: ExecutorMode,

    /// Register the bundled example pipeline.
    #[serde(default)]
    pub load_examples: bool,

    /// Schedule expression advertised for the production pipeline.
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            executor: default_executor(),
            load_examples: false,
            schedule: default_schedule(),
        }
    }
}

fn default_executor() -> ExecutorMode {
    ExecutorMode::Local
}
fn default_schedule() -> String {
    "@daily".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30_000
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

// ---------------------------------------------------------------------------
// Derived settings
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Resolved data directory with `~` expanded.
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.data_dir)
    }

    /// Directory backing the object store.
    pub fn object_store_root(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("objects"))
    }

    /// Path of the libSQL database file.
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("mocktailverse.db"))
    }

    /// Extract concurrency after applying the executor mode.
    pub fn effective_concurrency(&self) -> u32 {
        match self.scheduler.executor {
            ExecutorMode::Sequential => 1,
            ExecutorMode::Local => self.source.concurrency.max(1),
        }
    }

    /// Apply `MOCKTAILVERSE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(executor) = lookup(EXECUTOR_ENV).filter(|v| !v.is_empty()) {
            self.scheduler.executor = executor.parse()?;
        }
        if let Some(flag) = lookup(LOAD_EXAMPLES_ENV).filter(|v| !v.is_empty()) {
            self.scheduler.load_examples = parse_bool(&flag).ok_or_else(|| {
                MocktailverseError::config(format!(
                    "{LOAD_EXAMPLES_ENV} must be true or false, got '{flag}'"
                ))
            })?;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.defaults.data_dir = dir;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir().ok_or_else(|| {
                MocktailverseError::config("could not determine home directory")
            })?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Cloud credentials
// ---------------------------------------------------------------------------

/// Region and credential pair resolved from the environment.
#[derive(Clone)]
pub struct CloudCredentials {
    pub region: String,
    pub access_key_id: String,
    secret_access_key: String,
}

impl CloudCredentials {
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl std::fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Resolve the region (falling back to the configured default).
pub fn resolve_region(config: &AppConfig) -> String {
    std::env::var(&config.cloud.region_env)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| config.cloud.default_region.clone())
}

/// Check that the credential env vars are set and non-empty.
pub fn validate_credentials(config: &AppConfig) -> Result<CloudCredentials> {
    let read = |name: &str| -> Result<String> {
        match std::env::var(name) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Err(MocktailverseError::config(format!(
                "cloud credentials not found. Set the {name} environment variable."
            ))),
        }
    };

    Ok(CloudCredentials {
        region: resolve_region(config),
        access_key_id: read(&config.cloud.access_key_env)?,
        secret_access_key: read(&config.cloud.secret_key_env)?,
    })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mocktailverse/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MocktailverseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mocktailverse/mocktailverse.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply env overrides.
/// Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides()?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MocktailverseError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MocktailverseError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MocktailverseError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MocktailverseError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MocktailverseError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("AWS_DEFAULT_REGION"));
        assert!(toml_str.contains("mocktailverse-processed-data"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.scheduler.executor, ExecutorMode::Local);
        assert!(!parsed.scheduler.load_examples);
        assert_eq!(parsed.retry.max_retries, 3);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[defaults]
data_dir = "/tmp/mocktailverse"

[scheduler]
executor = "sequential"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/mocktailverse"));
        assert_eq!(config.scheduler.executor, ExecutorMode::Sequential);
        assert_eq!(config.effective_concurrency(), 1);
        assert_eq!(config.buckets.raw, "mocktailverse-raw-data");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|name| match name {
                EXECUTOR_ENV => Some("SequentialExecutor".into()),
                LOAD_EXAMPLES_ENV => Some("true".into()),
                DATA_DIR_ENV => Some("/srv/data".into()),
                _ => None,
            })
            .expect("apply overrides");

        assert_eq!(config.scheduler.executor, ExecutorMode::Sequential);
        assert!(config.scheduler.load_examples);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/srv/data/mocktailverse.db"));
    }

    #[test]
    fn invalid_env_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|name| {
            (name == LOAD_EXAMPLES_ENV).then(|| "maybe".to_string())
        });
        assert!(result.unwrap_err().to_string().contains("true or false"));
    }

    #[test]
    fn credential_validation() {
        let mut config = AppConfig::default();
        // Unique env var names avoid interfering with other tests
        config.cloud.access_key_env = "MV_TEST_NONEXISTENT_ACCESS_KEY_12345".into();
        config.cloud.secret_key_env = "MV_TEST_NONEXISTENT_SECRET_KEY_12345".into();
        let result = validate_credentials(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("MV_TEST_NONEXISTENT_ACCESS_KEY_12345"));
    }

    #[test]
    fn region_falls_back_to_default() {
        let mut config = AppConfig::default();
        config.cloud.region_env = "MV_TEST_NONEXISTENT_REGION_12345".into();
        config.cloud.default_region = "eu-west-1".into();
        assert_eq!(resolve_region(&config), "eu-west-1");
    }
}
