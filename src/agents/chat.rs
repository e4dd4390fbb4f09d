//! Conversational agents: plain chat, and chat with bound tools.

use super::{Agent, AgentOutput};
use crate::error::Result;
use crate::graph::{CompiledGraph, GraphState, MessagesState, Node, StateGraph, END, START};
use crate::llm::{ChatModel, ToolSpec};
use crate::message::{add_messages, Message};
use crate::tools::{route_tools, ToolNode, ToolSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// State of the chat graphs: just the conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatState {
    pub messages: Vec<Message>,
}

impl ChatState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Messages to merge into a [`ChatState`].
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    pub messages: Vec<Message>,
}

impl GraphState for ChatState {
    type Update = ChatUpdate;

    fn apply(&mut self, update: ChatUpdate) {
        add_messages(&mut self.messages, update.messages);
    }
}

impl MessagesState for ChatState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_update(messages: Vec<Message>) -> ChatUpdate {
        ChatUpdate { messages }
    }
}

/// Sends the whole history to the model and appends its reply.
pub struct ChatbotNode {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
}

impl ChatbotNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            tools: Vec::new(),
        }
    }

    /// Bind tools the model may call.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

#[async_trait]
impl Node<ChatState> for ChatbotNode {
    async fn run(&self, state: &ChatState) -> Result<ChatUpdate> {
        let reply = self.model.invoke(&state.messages, &self.tools).await?;
        Ok(ChatUpdate {
            messages: vec![reply],
        })
    }
}

/// `START -> chatbot -> END`.
pub fn chat_graph(model: Arc<dyn ChatModel>, recursion_limit: usize) -> Result<CompiledGraph<ChatState>> {
    let mut graph = StateGraph::new().with_recursion_limit(recursion_limit);
    graph
        .add_node("chatbot", ChatbotNode::new(model))
        .add_edge(START, "chatbot")
        .add_edge("chatbot", END);
    graph.compile()
}

/// `START -> chatbot`, then `chatbot -> tools -> chatbot` while the model asks for tools.
pub fn tool_chat_graph(
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    recursion_limit: usize,
) -> Result<CompiledGraph<ChatState>> {
    let mut graph = StateGraph::new().with_recursion_limit(recursion_limit);
    graph
        .add_node("chatbot", ChatbotNode::new(model).with_tools(tools.specs()))
        .add_node("tools", ToolNode::new(tools))
        .add_edge(START, "chatbot")
        .add_edge("tools", "chatbot")
        .add_conditional_edges(
            "chatbot",
            route_tools::<ChatState>("tools"),
            [("tools", "tools"), (END, END)],
        );
    graph.compile()
}

/// A compiled chat graph exposed as an [`Agent`].
pub struct ChatAgent {
    name: String,
    description: String,
    graph: CompiledGraph<ChatState>,
}

impl ChatAgent {
    pub fn new(name: &str, description: &str, graph: CompiledGraph<ChatState>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            graph,
        }
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, messages: Vec<Message>) -> Result<AgentOutput> {
        let (state, steps) = self.graph.invoke_traced(ChatState::new(messages)).await?;
        Ok(AgentOutput {
            messages: state.messages,
            steps,
            data: None,
        })
    }
}
