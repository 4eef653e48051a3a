//! Application configuration for LeadLoom.
//!
//! User config lives at `~/.leadloom/leadloom.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file — only the env var names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadloomError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadloom.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadloom";

// ---------------------------------------------------------------------------
// Config structs (matching leadloom.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Web search settings (discovery).
    #[serde(default)]
    pub search: SearchConfig,

    /// OpenRouter settings (extraction).
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Fixed delay between rows in milliseconds (throttle against the
    /// external services).
    #[serde(default = "default_row_delay_ms")]
    pub row_delay_ms: u64,

    /// Maximum characters of discovered content passed to extraction.
    #[serde(default = "default_content_cap")]
    pub content_cap: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            row_delay_ms: default_row_delay_ms(),
            content_cap: default_content_cap(),
        }
    }
}

fn default_row_delay_ms() -> u64 {
    2500
}
fn default_content_cap() -> usize {
    12_000
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key (never the key itself).
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Timeout for search requests in seconds.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_api_key_env(),
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_api_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_search_timeout_secs() -> u64 {
    10
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Default model to use for extraction.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_api_key_env(),
            base_url: default_llm_base_url(),
            default_model: default_model(),
        }
    }
}

fn default_llm_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// The two downstream client secrets, resolved from the environment.
///
/// Only presence is checked here; validity is established by the services
/// themselves on first use.
#[derive(Clone)]
pub struct Credentials {
    pub search_api_key: String,
    pub llm_api_key: String,
}

impl Credentials {
    /// Resolve both keys from the env vars named in `config`.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            search_api_key: require_env(&config.search.api_key_env)?,
            llm_api_key: require_env(&config.openrouter.api_key_env)?,
        })
    }

    /// Whether both keys are present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.search_api_key.trim().is_empty() && !self.llm_api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("search_api_key", &"***")
            .field("llm_api_key", &"***")
            .finish()
    }
}

fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(LeadloomError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Downstream client credentials; checked for presence on `start`.
    pub credentials: Credentials,
    /// Fixed inter-row delay.
    pub row_delay: Duration,
    /// Maximum characters of discovered content passed to extraction.
    pub content_cap: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &AppConfig, credentials: Credentials) -> Self {
        Self {
            credentials,
            row_delay: Duration::from_millis(config.defaults.row_delay_ms),
            content_cap: config.defaults.content_cap,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadloom/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadloomError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadloom/leadloom.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadloomError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadloomError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadloomError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadloomError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadloomError::io(&path, e))?;
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
        assert!(toml_str.contains("row_delay_ms"));
        assert!(toml_str.contains("SERPER_API_KEY"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.row_delay_ms, 2500);
        assert_eq!(parsed.defaults.content_cap, 12_000);
        assert_eq!(parsed.search.endpoint, "https://google.serper.dev/search");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
row_delay_ms = 500

[openrouter]
default_model = "openai/gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.row_delay_ms, 500);
        assert_eq!(config.defaults.content_cap, 12_000);
        assert_eq!(config.openrouter.default_model, "openai/gpt-4o-mini");
        assert_eq!(config.search.api_key_env, "SERPER_API_KEY");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let credentials = Credentials {
            search_api_key: "sk-search".into(),
            llm_api_key: "sk-llm".into(),
        };
        let pipeline = PipelineConfig::from_config(&app, credentials);
        assert_eq!(pipeline.row_delay, Duration::from_millis(2500));
        assert_eq!(pipeline.content_cap, 12_000);
        assert!(pipeline.credentials.is_complete());
    }

    #[test]
    fn credentials_missing_env_var() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.search.api_key_env = "LL_TEST_NONEXISTENT_KEY_12345".into();
        let result = Credentials::from_env(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn credentials_completeness() {
        let complete = Credentials {
            search_api_key: "a".into(),
            llm_api_key: "b".into(),
        };
        assert!(complete.is_complete());

        let blank = Credentials {
            search_api_key: "  ".into(),
            llm_api_key: "b".into(),
        };
        assert!(!blank.is_complete());
    }

    #[test]
    fn credentials_debug_redacts_keys() {
        let creds = Credentials {
            search_api_key: "super-secret".into(),
            llm_api_key: "also-secret".into(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
