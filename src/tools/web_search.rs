//! Web search through the Tavily API.

use super::Tool;
use crate::config::TavilySettings;
use crate::error::{CogitoError, Result};
use crate::openai::env_value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// One search hit, as handed to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    url: String,
    #[serde(default)]
    content: String,
}

/// Search the web and return the top results as JSON.
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
}

impl WebSearch {
    /// Create a search tool for `endpoint`.
    pub fn new(endpoint: &str, api_key: &str, max_results: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            max_results,
        })
    }

    /// Create the tool from the `[tavily]` settings; the API key must be in the environment.
    pub fn from_settings(settings: &TavilySettings) -> Result<Self> {
        let api_key = env_value(&settings.api_key_env)
            .ok_or_else(|| CogitoError::Config(format!("{} not set", settings.api_key_env)))?;
        Self::new(
            &settings.endpoint,
            &api_key,
            settings.max_results,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Run a search.
    #[instrument(skip(self), fields(max_results = self.max_results))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": query,
                "max_results": self.max_results,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CogitoError::Tool(format!("Search failed with HTTP {}: {}", status, body)));
        }

        let parsed: TavilyResponse = response.json().await?;
        debug!("Search returned {} result(s)", parsed.results.len());

        Ok(parsed
            .results
            .into_iter()
            .take(self.max_results as usize)
            .map(|hit| SearchResult {
                url: hit.url,
                content: hit.content,
            })
            .collect())
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
        Useful for when you need to answer questions about current events. \
        Input should be a search query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| CogitoError::Tool("Missing 'query' argument".to_string()))?;
        let results = self.search(query).await?;
        Ok(serde_json::to_string(&results)?)
    }
}
