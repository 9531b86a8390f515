//! Environment configuration
//!
//! Everything is read from the environment once at startup; the rest of
//! the crate receives a validated `Config` by reference.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Environment variable names
pub const ENV_ENDPOINT: &str = "SHELLPILOT_ENDPOINT";
pub const ENV_API_KEY: &str = "SHELLPILOT_API_KEY";
pub const ENV_MODELS: &str = "SHELLPILOT_MODELS";
pub const ENV_TAVILY_KEYS: &str = "TAVILY_API_KEYS";
pub const ENV_LINKUP_KEYS: &str = "LINKUP_API_KEYS";
pub const ENV_BRAVE_KEYS: &str = "BRAVE_API_KEYS";
pub const ENV_SEARCH_PROVIDER: &str = "WEB_SEARCH_PROVIDER";

/// Defaults
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SYSTEM_PROMPT: &str = "Be precise and concise.";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("endpoint not found. Set {ENV_ENDPOINT} environment variable")]
    EndpointNotFound,

    #[error("API key not found. Set {ENV_API_KEY} environment variable")]
    ApiKeyNotFound,

    #[error("invalid model: {model}. Available: {available}")]
    InvalidModel { model: String, available: String },

    #[error("all API keys exhausted")]
    NoAvailableKeys,

    #[error(
        "web search API key not found. Set {ENV_TAVILY_KEYS}, {ENV_LINKUP_KEYS}, \
         or {ENV_BRAVE_KEYS} to use --web"
    )]
    SearchKeyNotFound,

    #[error("invalid search provider: {0}. Use 'tavily', 'linkup', or 'brave'")]
    InvalidSearchProvider(String),
}

/// Which web search backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProviderKind {
    Tavily,
    Linkup,
    Brave,
}

impl SearchProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tavily => "tavily",
            Self::Linkup => "linkup",
            Self::Brave => "brave",
        }
    }
}

impl fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tavily" => Ok(Self::Tavily),
            "linkup" => Ok(Self::Linkup),
            "brave" => Ok(Self::Brave),
            other => Err(ConfigError::InvalidSearchProvider(other.to_string())),
        }
    }
}

/// A pool of API keys with forward-only rotation.
///
/// Rotation advances to the next key and never wraps; once the pool is
/// exhausted the caller sees `NoAvailableKeys`.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    current: Mutex<usize>,
}

impl KeyRotator {
    /// Build from an explicit key list
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            current: Mutex::new(0),
        }
    }

    /// Build from a comma-separated environment variable
    pub fn from_env(var: &str) -> Self {
        let keys = std::env::var(var)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        Self::new(keys)
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Zero-based index of the active key
    pub fn current_index(&self) -> usize {
        *self.current.lock().unwrap()
    }

    /// The active key, if any are configured
    pub fn current_key(&self) -> Option<String> {
        let idx = *self.current.lock().unwrap();
        self.keys.get(idx).cloned()
    }

    /// Advance to the next key. Returns `(from_index, to_index)`.
    pub fn rotate(&self) -> Result<(usize, usize), ConfigError> {
        let mut idx = self.current.lock().unwrap();
        let next = *idx + 1;
        if next >= self.keys.len() {
            return Err(ConfigError::NoAvailableKeys);
        }
        let from = *idx;
        *idx = next;
        Ok((from, next))
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Chat endpoint (single key)
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub available_models: Vec<String>,

    // Key pools for search providers
    pub tavily_keys: Arc<KeyRotator>,
    pub linkup_keys: Arc<KeyRotator>,
    pub brave_keys: Arc<KeyRotator>,
    pub search_provider: SearchProviderKind,

    // Runtime flags (set from CLI arguments)
    pub stream: bool,
    pub usage: bool,
    pub web_search: bool,
    pub citations: bool,
    pub interactive: bool,
}

impl Config {
    /// Load and validate configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = std::env::var(ENV_ENDPOINT)
            .ok()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::EndpointNotFound)?;

        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::ApiKeyNotFound)?;

        let available_models: Vec<String> = std::env::var(ENV_MODELS)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();

        let model = available_models
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let tavily_keys = Arc::new(KeyRotator::from_env(ENV_TAVILY_KEYS));
        let linkup_keys = Arc::new(KeyRotator::from_env(ENV_LINKUP_KEYS));
        let brave_keys = Arc::new(KeyRotator::from_env(ENV_BRAVE_KEYS));

        // Prefer the configured provider, else the first one with keys
        let search_provider = match std::env::var(ENV_SEARCH_PROVIDER) {
            Ok(name) if !name.trim().is_empty() => name.trim().parse()?,
            _ => {
                if tavily_keys.has_keys() {
                    SearchProviderKind::Tavily
                } else if linkup_keys.has_keys() {
                    SearchProviderKind::Linkup
                } else if brave_keys.has_keys() {
                    SearchProviderKind::Brave
                } else {
                    SearchProviderKind::Tavily
                }
            }
        };

        Ok(Self {
            endpoint,
            api_key,
            model,
            available_models,
            tavily_keys,
            linkup_keys,
            brave_keys,
            search_provider,
            stream: false,
            usage: false,
            web_search: false,
            citations: false,
            interactive: false,
        })
    }

    /// Full URL for the chat completions endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint)
    }

    /// True if the model is allowed by the configured model list.
    /// An empty list disables validation.
    pub fn validate_model(&self, model: &str) -> bool {
        self.available_models.is_empty() || self.available_models.iter().any(|m| m == model)
    }

    /// Set the active model, validating against the configured list
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ConfigError> {
        let model = model.into();
        if !self.validate_model(&model) {
            return Err(ConfigError::InvalidModel {
                model,
                available: self.available_models_string(),
            });
        }
        self.model = model;
        Ok(())
    }

    /// Formatted list of configured models for display
    pub fn available_models_string(&self) -> String {
        if self.available_models.is_empty() {
            format!("(not configured - set {})", ENV_MODELS)
        } else {
            self.available_models.join(", ")
        }
    }

    /// Key rotator for the active search provider
    pub fn search_keys(&self) -> &Arc<KeyRotator> {
        match self.search_provider {
            SearchProviderKind::Tavily => &self.tavily_keys,
            SearchProviderKind::Linkup => &self.linkup_keys,
            SearchProviderKind::Brave => &self.brave_keys,
        }
    }

    /// Validate that the active search provider has at least one key
    pub fn require_search_keys(&self) -> Result<(), ConfigError> {
        if self.search_keys().has_keys() {
            Ok(())
        } else {
            Err(ConfigError::SearchKeyNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rotator_rotation() {
        let rotator = KeyRotator::new(vec!["k1".into(), "k2".into(), "k3".into()]);
        assert!(rotator.has_keys());
        assert_eq!(rotator.key_count(), 3);
        assert_eq!(rotator.current_key().as_deref(), Some("k1"));

        assert_eq!(rotator.rotate().unwrap(), (0, 1));
        assert_eq!(rotator.current_key().as_deref(), Some("k2"));
        assert_eq!(rotator.rotate().unwrap(), (1, 2));
        assert!(matches!(
            rotator.rotate(),
            Err(ConfigError::NoAvailableKeys)
        ));
        // Exhaustion leaves the last key active
        assert_eq!(rotator.current_key().as_deref(), Some("k3"));
    }

    #[test]
    fn test_key_rotator_single_key_never_rotates() {
        let rotator = KeyRotator::new(vec!["only".into()]);
        assert!(matches!(
            rotator.rotate(),
            Err(ConfigError::NoAvailableKeys)
        ));
    }

    #[test]
    fn test_key_rotator_empty() {
        let rotator = KeyRotator::new(vec![]);
        assert!(!rotator.has_keys());
        assert_eq!(rotator.current_key(), None);
    }

    #[test]
    fn test_search_provider_parse() {
        assert_eq!(
            "tavily".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::Tavily
        );
        assert_eq!(
            "Brave".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::Brave
        );
        assert!("bing".parse::<SearchProviderKind>().is_err());
    }

    #[test]
    fn test_model_validation() {
        let config = Config {
            endpoint: "https://api.example.com".into(),
            api_key: "k".into(),
            model: "gpt-4o".into(),
            available_models: vec!["gpt-4o".into(), "gpt-4o-mini".into()],
            tavily_keys: Arc::new(KeyRotator::new(vec![])),
            linkup_keys: Arc::new(KeyRotator::new(vec![])),
            brave_keys: Arc::new(KeyRotator::new(vec![])),
            search_provider: SearchProviderKind::Tavily,
            stream: false,
            usage: false,
            web_search: false,
            citations: false,
            interactive: false,
        };

        assert!(config.validate_model("gpt-4o-mini"));
        assert!(!config.validate_model("gpt-3.5"));
        assert_eq!(config.chat_url(), "https://api.example.com/v1/chat/completions");

        let mut config = config;
        assert!(config.set_model("gpt-4o-mini").is_ok());
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.set_model("nope").is_err());
    }
}
