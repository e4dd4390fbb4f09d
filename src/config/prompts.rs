//! Prompt templates for Cogito.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub crypto: CryptoPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the crypto agents.
///
/// Every template receives `{{messages}}` (the conversation so far),
/// `{{data}}` (API data gathered so far, as JSON) and `{{api_base}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoPrompts {
    /// Choose between fetching data and answering.
    pub decide: String,
    /// Produce the API request descriptor.
    pub create_api_call: String,
    /// Answer the user.
    pub generate: String,
    /// Answer the user, with a code execution tool available for charts.
    pub generate_with_charts: String,
}

impl Default for CryptoPrompts {
    fn default() -> Self {
        Self {
            decide: r#"You are a crypto expert and will help the user with their crypto questions.
The message history is the following:

Messages: {{messages}}

And data gathered so far is the following:

Data: {{data}}

You have the following options:

1. 'create_api_call': Create an API call (Use the CoinGecko API at {{api_base}} to retrieve data)
2. 'generate': Generate a response if you have what you need to answer

Answer with just the option name and nothing else."#
                .to_string(),

            create_api_call: r#"Your job is to create an API call to retrieve data from the CoinGecko API ({{api_base}}).
The call should retrieve data to help answer the user's question.

The message history is the following:

Messages: {{messages}}

And data gathered so far is the following:

Data: {{data}}

Please create an API call to retrieve the necessary data."#
                .to_string(),

            generate: r#"You are a crypto expert and will help the user with their crypto questions.

The message history is the following:

Messages: {{messages}}

And data gathered so far is the following:

Data: {{data}}

Your job is to formulate a response that answers the user's question."#
                .to_string(),

            generate_with_charts: r#"You are a crypto expert and will help the user with their crypto questions.

The message history is the following:

Messages: {{messages}}

And data gathered so far is the following:

Data: {{data}}

Your job is to formulate a response that answers the user's question.
You should always try to return good visual data graphics to help the user understand better."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let crypto_path = custom_path.join("crypto.toml");
            if crypto_path.exists() {
                let content = std::fs::read_to_string(&crypto_path)?;
                prompts.crypto = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
