//! State of the crypto graphs.

use crate::error::{CogitoError, Result};
use crate::graph::{GraphState, MessagesState};
use crate::llm::OutputSchema;
use crate::message::{add_messages, Message};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// What the decision node chose to do next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Fetch more data from the market API.
    CreateApiCall,
    /// Answer with what has been gathered.
    Generate,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::CreateApiCall => "create_api_call",
            Decision::Generate => "generate",
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = CogitoError;

    /// Accepts the bare option name, tolerating whitespace, quotes,
    /// backticks, a trailing period and casing.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let unquoted = s
            .trim()
            .trim_matches(|c| c == '\'' || c == '"' || c == '`');
        let cleaned = unquoted
            .strip_suffix('.')
            .unwrap_or(unquoted)
            .trim_matches(|c| c == '\'' || c == '"' || c == '`')
            .trim()
            .to_lowercase();
        match cleaned.as_str() {
            "create_api_call" => Ok(Decision::CreateApiCall),
            "generate" => Ok(Decision::Generate),
            _ => Err(CogitoError::Agent(format!(
                "Model chose an unknown option: '{}'",
                s.trim()
            ))),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// HTTP request descriptor produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiCall {
    /// The URL to call.
    pub url: String,
    /// The HTTP method to use.
    #[serde(default = "default_method")]
    pub method: String,
    /// The headers to send.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// The body to send.
    #[serde(default)]
    pub body: Map<String, Value>,
}

impl ApiCall {
    /// A GET request without headers or body.
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: Map::new(),
        }
    }

    /// Schema for structured output.
    pub fn schema() -> OutputSchema {
        OutputSchema {
            name: "ApiCall".to_string(),
            description: "An HTTP request to the market data API".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The URL to call" },
                    "method": { "type": "string", "description": "The HTTP method to use", "default": "GET" },
                    "headers": {
                        "type": "object",
                        "description": "The headers to send",
                        "additionalProperties": { "type": "string" }
                    },
                    "body": { "type": "object", "description": "The body to send" }
                },
                "required": ["url"]
            }),
        }
    }

    /// Body as form fields; non-string values are sent as their JSON text.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.body
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

/// State shared by the crypto graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoState {
    pub messages: Vec<Message>,
    pub decision: Option<Decision>,
    pub api_call: Option<ApiCall>,
    /// Data gathered from the API so far.
    pub data: Value,
}

impl Default for CryptoState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            decision: None,
            api_call: None,
            data: Value::Object(Map::new()),
        }
    }
}

impl CryptoState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Decision recorded by the last decision step.
    pub fn require_decision(&self) -> Result<Decision> {
        self.decision
            .ok_or_else(|| CogitoError::Graph("No decision has been made yet".to_string()))
    }
}

/// Partial update of a [`CryptoState`]. `None` fields leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct CryptoUpdate {
    pub messages: Vec<Message>,
    pub decision: Option<Decision>,
    pub api_call: Option<ApiCall>,
    pub data: Option<Value>,
}

impl CryptoUpdate {
    pub fn decision(decision: Decision) -> Self {
        Self {
            decision: Some(decision),
            ..Self::default()
        }
    }

    pub fn api_call(api_call: ApiCall) -> Self {
        Self {
            api_call: Some(api_call),
            ..Self::default()
        }
    }

    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

impl GraphState for CryptoState {
    type Update = CryptoUpdate;

    fn apply(&mut self, update: CryptoUpdate) {
        add_messages(&mut self.messages, update.messages);
        if let Some(decision) = update.decision {
            self.decision = Some(decision);
        }
        if let Some(api_call) = update.api_call {
            self.api_call = Some(api_call);
        }
        if let Some(data) = update.data {
            self.data = data;
        }
    }
}

impl MessagesState for CryptoState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_update(messages: Vec<Message>) -> CryptoUpdate {
        CryptoUpdate {
            messages,
            ..CryptoUpdate::default()
        }
    }
}
