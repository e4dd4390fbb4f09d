//! Chat model backed by the OpenAI chat completions API.

use super::{ChatModel, OutputSchema, ToolSpec};
use crate::config::{AzureSettings, OpenAISettings};
use crate::error::{CogitoError, Result};
use crate::message::Message;
use crate::openai::{azure_config, azure_deployment, create_client, openai_config};
use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model served through Azure OpenAI.
pub type AzureChatModel = OpenAIChatModel<AzureConfig>;

/// Chat model for any OpenAI-compatible endpoint.
pub struct OpenAIChatModel<C: Config> {
    client: Client<C>,
    model: String,
    temperature: Option<f32>,
}

impl<C: Config> OpenAIChatModel<C> {
    /// Wrap an existing client.
    pub fn with_client(client: Client<C>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequestArgs> {
        let messages = messages
            .iter()
            .map(Message::to_openai)
            .collect::<Result<Vec<ChatCompletionRequestMessage>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }
        Ok(args)
    }

    async fn send(&self, request: CreateChatCompletionRequest) -> Result<Message> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CogitoError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CogitoError::Llm("No response from model".to_string()))?;

        Ok(choice.message.into())
    }
}

impl OpenAIChatModel<OpenAIConfig> {
    /// Create a model from the `[openai]` settings.
    pub fn from_settings(settings: &OpenAISettings) -> Result<Self> {
        let client = create_client(
            openai_config(settings)?,
            Duration::from_secs(settings.timeout_secs),
        )?;
        let model = Self::with_client(client, &settings.model);
        Ok(match settings.temperature {
            Some(temperature) => model.with_temperature(temperature),
            None => model,
        })
    }
}

impl OpenAIChatModel<AzureConfig> {
    /// Create a model from the `[azure]` settings. The deployment decides the model.
    pub fn from_azure_settings(settings: &AzureSettings, timeout: Duration) -> Result<Self> {
        let config = azure_config(settings)?;
        let deployment = azure_deployment(settings)
            .ok_or_else(|| CogitoError::Config("Azure deployment not configured".to_string()))?;
        let client = create_client(config, timeout)?;
        Ok(Self::with_client(client, &deployment))
    }
}

#[async_trait]
impl<C: Config + Send + Sync + 'static> ChatModel for OpenAIChatModel<C> {
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len(), tools = tools.len()))]
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let mut args = self.request(messages)?;
        if !tools.is_empty() {
            args.tools(tools.iter().map(ToolSpec::to_openai).collect::<Vec<_>>());
        }
        let request = args.build().map_err(|e| CogitoError::Llm(e.to_string()))?;

        let reply = self.send(request).await?;
        debug!(
            "Model replied with {} chars and {} tool call(s)",
            reply.content.len(),
            reply.tool_calls.len()
        );
        Ok(reply)
    }

    #[instrument(skip(self, messages, schema), fields(model = %self.model, schema = %schema.name))]
    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> Result<serde_json::Value> {
        let mut args = self.request(messages)?;
        args.response_format(ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some(schema.description.clone()),
                name: schema.name.clone(),
                schema: Some(schema.schema.clone()),
                strict: Some(false),
            },
        });
        let request = args.build().map_err(|e| CogitoError::Llm(e.to_string()))?;

        let reply = self.send(request).await?;
        serde_json::from_str(&reply.content).map_err(|e| {
            CogitoError::Llm(format!("Model returned invalid JSON for '{}': {}", schema.name, e))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
