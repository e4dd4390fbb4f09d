//! Chat model abstraction.
//!
//! Nodes talk to language models through [`ChatModel`], so the graphs can run
//! against OpenAI, Azure OpenAI or a scripted mock.

mod mock;
mod openai;

pub use mock::{MockChatModel, MockReply, MockRequest};
pub use openai::{AzureChatModel, OpenAIChatModel};

use crate::error::{CogitoError, Result};
use crate::message::Message;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Description of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn to_openai(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.parameters.clone()),
                strict: None,
            },
        }
    }
}

/// Named JSON schema for structured output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// A chat completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant reply.
    ///
    /// Passing tool specs binds those tools: the reply may carry tool calls
    /// instead of (or alongside) text.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;

    /// Send the conversation and return a JSON value matching `schema`.
    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> Result<serde_json::Value>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Render `prompt` as a single user message and return the reply text.
pub async fn invoke_text(model: &dyn ChatModel, prompt: &str) -> Result<String> {
    let reply = model.invoke(&[Message::user(prompt)], &[]).await?;
    Ok(reply.content)
}

/// Structured output deserialized into `T`.
pub async fn invoke_typed<T: DeserializeOwned>(
    model: &dyn ChatModel,
    messages: &[Message],
    schema: &OutputSchema,
) -> Result<T> {
    let value = model.invoke_structured(messages, schema).await?;
    serde_json::from_value(value).map_err(|e| {
        CogitoError::Llm(format!("Structured output does not match '{}': {}", schema.name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_spec_to_openai() {
        let spec = ToolSpec {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let tool = spec.to_openai();
        assert_eq!(tool.function.name, "web_search");
        assert_eq!(tool.function.description.as_deref(), Some("Search the web"));
    }

    #[tokio::test]
    async fn test_invoke_text_sends_single_user_message() {
        let model = MockChatModel::new(vec![MockReply::text("generate")]);
        let answer = invoke_text(&model, "pick one").await.unwrap();
        assert_eq!(answer, "generate");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].content, "pick one");
    }

    #[tokio::test]
    async fn test_invoke_typed_rejects_mismatch() {
        #[derive(Debug, Deserialize)]
        struct Pair {
            #[allow(dead_code)]
            left: u32,
        }

        let schema = OutputSchema {
            name: "pair".to_string(),
            description: "a pair".to_string(),
            schema: json!({"type": "object"}),
        };
        let model = MockChatModel::new(vec![MockReply::Structured(json!({"right": 1}))]);
        let err = invoke_typed::<Pair>(&model, &[Message::user("x")], &schema)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pair"));
    }
}
