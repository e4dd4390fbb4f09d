//! OpenAI and Azure OpenAI client configuration.

use crate::config::{AzureSettings, OpenAISettings};
use crate::error::{CogitoError, Result};
use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::Client;
use std::time::Duration;

/// Variable consulted when the configured key variable is unset.
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Create a client with the given HTTP timeout.
pub fn create_client<C: Config>(config: C, timeout: Duration) -> Result<Client<C>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Read a non-empty environment variable.
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the OpenAI API key: the configured variable first, then `OPENAI_API_KEY`.
pub fn openai_api_key(settings: &OpenAISettings) -> Option<String> {
    env_value(&settings.api_key_env).or_else(|| env_value(FALLBACK_API_KEY_ENV))
}

/// Build the OpenAI client configuration from settings and environment.
pub fn openai_config(settings: &OpenAISettings) -> Result<OpenAIConfig> {
    let api_key = openai_api_key(settings).ok_or_else(|| {
        CogitoError::Config(format!(
            "No OpenAI API key found. Set {} (or {}).",
            settings.api_key_env, FALLBACK_API_KEY_ENV
        ))
    })?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = settings.base_url.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }
    Ok(config)
}

/// Azure deployment name: `azure.deployment`, else `AZURE_OPENAI_DEPLOYMENT`.
pub fn azure_deployment(settings: &AzureSettings) -> Option<String> {
    settings
        .deployment
        .clone()
        .or_else(|| env_value("AZURE_OPENAI_DEPLOYMENT"))
}

/// Build the Azure OpenAI client configuration.
///
/// Endpoint, deployment and API version come from settings, falling back to
/// `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT` and `OPENAI_API_VERSION`.
pub fn azure_config(settings: &AzureSettings) -> Result<AzureConfig> {
    let endpoint = settings
        .endpoint
        .clone()
        .or_else(|| env_value("AZURE_OPENAI_ENDPOINT"))
        .ok_or_else(|| CogitoError::Config("Azure endpoint not configured (azure.endpoint or AZURE_OPENAI_ENDPOINT)".to_string()))?;
    let deployment = azure_deployment(settings)
        .ok_or_else(|| CogitoError::Config("Azure deployment not configured (azure.deployment or AZURE_OPENAI_DEPLOYMENT)".to_string()))?;
    let api_version = env_value("OPENAI_API_VERSION").unwrap_or_else(|| settings.api_version.clone());
    let api_key = env_value(&settings.api_key_env).ok_or_else(|| {
        CogitoError::Config(format!("{} not set", settings.api_key_env))
    })?;

    Ok(AzureConfig::new()
        .with_api_base(endpoint)
        .with_deployment_id(deployment)
        .with_api_version(api_version)
        .with_api_key(api_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config_requires_key() {
        let settings = OpenAISettings {
            api_key_env: "COGITO_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OpenAISettings::default()
        };
        if env_value(FALLBACK_API_KEY_ENV).is_none() {
            assert!(openai_config(&settings).is_err());
        }
    }

    #[test]
    fn test_azure_config_requires_key() {
        let settings = AzureSettings {
            endpoint: Some("https://example.openai.azure.com".to_string()),
            deployment: Some("gpt-4o".to_string()),
            api_key_env: "COGITO_TEST_AZURE_KEY_THAT_IS_NEVER_SET".to_string(),
            ..AzureSettings::default()
        };
        let err = azure_config(&settings).err().unwrap();
        assert!(err.to_string().contains("COGITO_TEST_AZURE_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(OpenAIConfig::new(), Duration::from_secs(5)).is_ok());
    }
}
