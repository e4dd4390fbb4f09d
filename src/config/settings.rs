//! Configuration settings for Cogito.

use crate::graph::DEFAULT_RECURSION_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub azure: AzureSettings,
    pub tavily: TavilySettings,
    pub python_repl: PythonReplSettings,
    pub crypto: CryptoSettings,
    pub tool_chat: ToolChatSettings,
    pub graph: GraphSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// OpenAI chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Chat model name.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Alternative OpenAI-compatible endpoint.
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature (model default when unset).
    pub temperature: Option<f32>,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "COGITO_OPENAI_API_KEY".to_string(),
            base_url: None,
            timeout_secs: 300,
            temperature: None,
        }
    }
}

/// Azure OpenAI settings, used by the plain chat agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Option<String>,
    /// Deployment name.
    pub deployment: Option<String>,
    pub api_version: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_version: "2024-08-01-preview".to_string(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
        }
    }
}

/// Tavily web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TavilySettings {
    pub endpoint: String,
    pub max_results: u32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for TavilySettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            max_results: 3,
            api_key_env: "TAVILY_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Code execution tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonReplSettings {
    /// Interpreter binary.
    pub interpreter: String,
    /// Maximum run time per snippet in seconds.
    pub timeout_secs: u64,
}

impl Default for PythonReplSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Crypto agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoSettings {
    /// Base URL of the market data API, offered to the model in prompts.
    pub api_base: String,
    /// Environment variable holding an optional API key.
    pub api_key_env: String,
    /// Header the API key is sent in.
    pub api_key_header: String,
    /// Timeout for the data request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CryptoSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.coingecko.com/api/v3".to_string(),
            api_key_env: "COINGECKO_API_KEY".to_string(),
            api_key_header: "x-cg-demo-api-key".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Tools bound by the tool playground agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolChatSettings {
    /// Tool names (`web_search`, `python_repl`).
    pub tools: Vec<String>,
}

impl Default for ToolChatSettings {
    fn default() -> Self {
        Self {
            tools: vec!["web_search".to_string(), "python_repl".to_string()],
        }
    }
}

/// Graph runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Maximum node executions per invocation.
    pub recursion_limit: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API. Empty means no cross-origin access.
    pub allowed_origins: Vec<String>,
    /// Threads kept in memory; the least recently updated is dropped first.
    pub max_threads: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2024,
            allowed_origins: Vec::new(),
            max_threads: 1000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CogitoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cogito")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}
