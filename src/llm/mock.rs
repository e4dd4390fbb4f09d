//! Scripted chat model for tests and offline runs.

use super::{ChatModel, OutputSchema, ToolSpec};
use crate::error::{CogitoError, Result};
use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Returned from `invoke`.
    Message(Message),
    /// Returned from `invoke_structured`.
    Structured(serde_json::Value),
}

impl MockReply {
    /// Plain assistant text.
    pub fn text(content: &str) -> Self {
        MockReply::Message(Message::assistant(content))
    }

    /// Assistant message calling one tool.
    pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        MockReply::Message(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        ))
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub messages: Vec<Message>,
    /// Names of the bound tools.
    pub tools: Vec<String>,
    /// Schema name for structured requests.
    pub schema: Option<String>,
}

/// Chat model that replays a fixed script and records every request.
///
/// Replies are consumed in order; asking for a message when the next reply is
/// structured (or the other way round) is an error, as is running past the
/// end of the script.
pub struct MockChatModel {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<MockRequest>>,
}

impl MockChatModel {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn record(&self, request: MockRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }

    fn next_reply(&self) -> Result<MockReply> {
        self.replies
            .lock()
            .map_err(|_| CogitoError::Llm("mock script lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| CogitoError::Llm("mock script exhausted".to_string()))
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        self.record(MockRequest {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            schema: None,
        });
        match self.next_reply()? {
            MockReply::Message(message) => Ok(message),
            MockReply::Structured(_) => Err(CogitoError::Llm(
                "mock expected a structured request".to_string(),
            )),
        }
    }

    async fn invoke_structured(&self, messages: &[Message], schema: &OutputSchema) -> Result<serde_json::Value> {
        self.record(MockRequest {
            messages: messages.to_vec(),
            tools: Vec::new(),
            schema: Some(schema.name.clone()),
        });
        match self.next_reply()? {
            MockReply::Structured(value) => Ok(value),
            MockReply::Message(_) => Err(CogitoError::Llm(
                "mock expected a plain chat request".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_runs_out() {
        let model = MockChatModel::new(vec![MockReply::text("one")]);
        assert_eq!(model.invoke(&[], &[]).await.unwrap().content, "one");
        assert_eq!(model.remaining(), 0);
        assert!(model.invoke(&[], &[]).await.is_err());
        assert_eq!(model.requests().len(), 2);
    }
}
