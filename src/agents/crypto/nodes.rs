//! Nodes of the crypto graphs.

use super::api::ApiClient;
use super::state::{ApiCall, CryptoState, CryptoUpdate, Decision};
use crate::config::Prompts;
use crate::error::Result;
use crate::graph::Node;
use crate::llm::{invoke_text, invoke_typed, ChatModel, ToolSpec};
use crate::message::{format_transcript, Message};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Prompt rendering shared by the model nodes.
#[derive(Clone)]
pub struct PromptContext {
    prompts: Arc<Prompts>,
    api_base: String,
}

impl PromptContext {
    pub fn new(prompts: Arc<Prompts>, api_base: &str) -> Self {
        Self {
            prompts,
            api_base: api_base.to_string(),
        }
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Fill `template` with the state's messages and data.
    pub fn render(&self, template: &str, state: &CryptoState) -> String {
        let data = serde_json::to_string_pretty(&state.data).unwrap_or_else(|_| state.data.to_string());
        let mut vars = HashMap::new();
        vars.insert("messages".to_string(), format_transcript(&state.messages));
        vars.insert("data".to_string(), data);
        vars.insert("api_base".to_string(), self.api_base.clone());
        self.prompts.render_with_custom(template, &vars)
    }
}

/// Asks the model whether to fetch more data or answer.
pub struct DecideNode {
    model: Arc<dyn ChatModel>,
    prompts: PromptContext,
}

impl DecideNode {
    pub fn new(model: Arc<dyn ChatModel>, prompts: PromptContext) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node<CryptoState> for DecideNode {
    async fn run(&self, state: &CryptoState) -> Result<CryptoUpdate> {
        let prompt = self.prompts.render(&self.prompts.prompts().crypto.decide, state);
        let answer = invoke_text(self.model.as_ref(), &prompt).await?;
        let decision: Decision = answer.parse()?;
        info!("Crypto agent decided: {}", decision);
        Ok(CryptoUpdate::decision(decision))
    }
}

/// Router: follow the recorded decision.
pub fn route_decision(state: &CryptoState) -> Result<String> {
    Ok(state.require_decision()?.as_str().to_string())
}

/// Asks the model for an API request descriptor.
pub struct CreateApiCallNode {
    model: Arc<dyn ChatModel>,
    prompts: PromptContext,
}

impl CreateApiCallNode {
    pub fn new(model: Arc<dyn ChatModel>, prompts: PromptContext) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node<CryptoState> for CreateApiCallNode {
    async fn run(&self, state: &CryptoState) -> Result<CryptoUpdate> {
        let prompt = self.prompts.render(&self.prompts.prompts().crypto.create_api_call, state);
        let call: ApiCall = invoke_typed(self.model.as_ref(), &[Message::user(prompt)], &ApiCall::schema()).await?;
        debug!("Model created API call: {} {}", call.method, call.url);
        Ok(CryptoUpdate::api_call(call))
    }
}

/// Performs the stored API call and keeps the response as data.
pub struct RetrieveDataNode {
    client: Arc<ApiClient>,
}

impl RetrieveDataNode {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Node<CryptoState> for RetrieveDataNode {
    async fn run(&self, state: &CryptoState) -> Result<CryptoUpdate> {
        let call = state.api_call.as_ref().ok_or_else(|| {
            crate::error::CogitoError::Graph("No API call to perform".to_string())
        })?;
        let data = self.client.execute(call).await?;
        Ok(CryptoUpdate::data(data))
    }
}

/// Writes the answer, optionally with tools bound.
pub struct GenerateNode {
    model: Arc<dyn ChatModel>,
    prompts: PromptContext,
    tools: Vec<ToolSpec>,
}

impl GenerateNode {
    /// Plain answer.
    pub fn new(model: Arc<dyn ChatModel>, prompts: PromptContext) -> Self {
        Self {
            model,
            prompts,
            tools: Vec::new(),
        }
    }

    /// Answer with tools available for building charts.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

#[async_trait]
impl Node<CryptoState> for GenerateNode {
    async fn run(&self, state: &CryptoState) -> Result<CryptoUpdate> {
        let crypto = &self.prompts.prompts().crypto;
        let template = if self.tools.is_empty() {
            &crypto.generate
        } else {
            &crypto.generate_with_charts
        };
        let prompt = self.prompts.render(template, state);
        let reply = self.model.invoke(&[Message::user(prompt)], &self.tools).await?;
        Ok(CryptoUpdate {
            messages: vec![reply],
            ..CryptoUpdate::default()
        })
    }
}
