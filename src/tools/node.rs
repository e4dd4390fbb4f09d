//! Tool execution node and tool router.

use super::ToolSet;
use crate::error::{CogitoError, Result};
use crate::graph::{MessagesState, Node, END};
use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

/// Runs every tool call of the last message and answers each with a tool message.
///
/// Calls run concurrently; results keep the order of the calls. A failing
/// tool, malformed arguments or an unknown tool name produce an error text
/// for the model to read, not a graph error.
pub struct ToolNode {
    tools: ToolSet,
}

impl ToolNode {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    async fn call(&self, call: &ToolCall) -> Message {
        info!("Calling tool: {} with args: {}", call.name, call.arguments);

        let content = match self.tools.get(&call.name) {
            None => format!(
                "Error: {} is not a valid tool, try one of [{}].",
                call.name,
                self.tools.names().join(", ")
            ),
            Some(tool) => match parse_arguments(&call.arguments) {
                Ok(args) => match tool.execute(args).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("Tool {} failed: {}", call.name, e);
                        format!("Error: {}", e)
                    }
                },
                Err(e) => format!("Error: invalid arguments for {}: {}", call.name, e),
            },
        };

        Message::tool(&call.id, &call.name, content)
    }
}

fn parse_arguments(raw: &str) -> serde_json::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

#[async_trait]
impl<S: MessagesState> Node<S> for ToolNode {
    async fn run(&self, state: &S) -> Result<S::Update> {
        let last = state
            .messages()
            .last()
            .ok_or_else(|| CogitoError::Graph("No messages found in input state".to_string()))?;

        if !last.has_tool_calls() {
            return Err(CogitoError::Graph(
                "Tool node reached but the last message has no tool calls".to_string(),
            ));
        }

        let results = join_all(last.tool_calls.iter().map(|call| self.call(call))).await;
        Ok(S::messages_update(results))
    }
}

/// Router for a conditional edge after a tool-calling model node.
///
/// Goes to `tools_node` when the last message asks for tools, otherwise to
/// [`END`]. An empty history is an error.
pub fn route_tools<S: MessagesState>(tools_node: &str) -> impl Fn(&S) -> Result<String> + Send + Sync + 'static {
    let target = tools_node.to_string();
    move |state: &S| {
        let last = state.messages().last().ok_or_else(|| {
            CogitoError::Graph("No messages found in input state to tool_edge".to_string())
        })?;
        if last.has_tool_calls() {
            Ok(target.clone())
        } else {
            Ok(END.to_string())
        }
    }
}
