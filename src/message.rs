//! Conversation messages and the message reducer.

use crate::error::{CogitoError, Result};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseMessage, ChatCompletionToolType, FunctionCall,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Call id, echoed back in the matching tool message.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique message id. Messages with the same id replace each other when merged.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name, set on tool messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Tool result answering the call with `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this message asks for at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Convert into the OpenAI request message type.
    pub fn to_openai(&self) -> Result<ChatCompletionRequestMessage> {
        let message: ChatCompletionRequestMessage = match self.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(self.content.clone())
                .build()
                .map_err(|e| CogitoError::Llm(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(self.content.clone())
                .build()
                .map_err(|e| CogitoError::Llm(e.to_string()))?
                .into(),
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !self.content.is_empty() {
                    args.content(self.content.clone());
                }
                if self.has_tool_calls() {
                    args.tool_calls(
                        self.tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                args.build()
                    .map_err(|e| CogitoError::Llm(e.to_string()))?
                    .into()
            }
            Role::Tool => {
                let tool_call_id = self.tool_call_id.clone().ok_or_else(|| {
                    CogitoError::Llm("Tool message is missing its tool_call_id".to_string())
                })?;
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(tool_call_id)
                    .content(self.content.clone())
                    .build()
                    .map_err(|e| CogitoError::Llm(e.to_string()))?
                    .into()
            }
        };
        Ok(message)
    }
}

impl From<ChatCompletionResponseMessage> for Message {
    fn from(response: ChatCompletionResponseMessage) -> Self {
        let tool_calls = response
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();
        Message::assistant_with_tool_calls(response.content.unwrap_or_default(), tool_calls)
    }
}

/// Merge `new` into `existing`.
///
/// A message whose id is already present replaces the old one in place,
/// everything else is appended in order.
pub fn add_messages(existing: &mut Vec<Message>, new: Vec<Message>) {
    for message in new {
        match existing.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => *slot = message,
            None => existing.push(message),
        }
    }
}

/// Render a message history as plain text for prompt templates.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let mut line = match (&m.role, &m.name) {
                (Role::Tool, Some(name)) => format!("tool ({}): {}", name, m.content),
                _ => format!("{}: {}", m.role, m.content),
            };
            if m.has_tool_calls() {
                let calls = m
                    .tool_calls
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                line.push_str(&format!(" [tool calls: {}]", calls));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
