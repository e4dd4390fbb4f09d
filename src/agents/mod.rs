//! The agents Cogito can run, and the registry that builds them from settings.

mod chat;
pub mod crypto;

pub use chat::{chat_graph, tool_chat_graph, ChatAgent, ChatState, ChatUpdate, ChatbotNode};
pub use crypto::{crypto_charts_graph, crypto_graph, CryptoAgent, CryptoState};

use crate::config::{Prompts, Settings};
use crate::error::{CogitoError, Result};
use crate::llm::{AzureChatModel, ChatModel, OpenAIChatModel};
use crate::message::{Message, Role};
use crate::openai::azure_config;
use crate::tools::{PythonRepl, Tool, ToolSet, WebSearch};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    /// Full conversation after the run, input included.
    pub messages: Vec<Message>,
    /// Node ids in the order they ran.
    pub steps: Vec<String>,
    /// Data the agent gathered, for agents that keep any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AgentOutput {
    /// The last assistant message.
    pub fn reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

/// A runnable agent.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the agent on a conversation.
    async fn invoke(&self, messages: Vec<Message>) -> Result<AgentOutput>;
}

/// The available agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Chat,
    SearchChat,
    ToolChat,
    Crypto,
    CryptoCharts,
}

impl AgentKind {
    pub fn all() -> [AgentKind; 5] {
        [
            AgentKind::Chat,
            AgentKind::SearchChat,
            AgentKind::ToolChat,
            AgentKind::Crypto,
            AgentKind::CryptoCharts,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Chat => "chat",
            AgentKind::SearchChat => "search_chat",
            AgentKind::ToolChat => "tool_chat",
            AgentKind::Crypto => "crypto",
            AgentKind::CryptoCharts => "crypto_charts",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Chat => "Plain chatbot on Azure OpenAI",
            AgentKind::SearchChat => "Chatbot that can search the web",
            AgentKind::ToolChat => "Chatbot bound to the tools listed in [tool_chat]",
            AgentKind::Crypto => "Crypto expert that fetches market data before answering",
            AgentKind::CryptoCharts => "Crypto expert that can also draw charts with Python",
        }
    }

    /// Tool names this agent binds under `settings`.
    pub fn tool_names(&self, settings: &Settings) -> Vec<String> {
        match self {
            AgentKind::Chat | AgentKind::Crypto => Vec::new(),
            AgentKind::SearchChat => vec!["web_search".to_string()],
            AgentKind::ToolChat => settings.tool_chat.tools.clone(),
            AgentKind::CryptoCharts => vec!["python_repl".to_string()],
        }
    }
}

impl std::str::FromStr for AgentKind {
    type Err = CogitoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('-', "_");
        AgentKind::all()
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| CogitoError::UnknownAgent(s.to_string()))
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a tool by name from settings.
pub fn tool_by_name(name: &str, settings: &Settings) -> Result<Arc<dyn Tool>> {
    match name {
        "web_search" => Ok(Arc::new(WebSearch::from_settings(&settings.tavily)?)),
        "python_repl" => Ok(Arc::new(PythonRepl::from_settings(&settings.python_repl))),
        other => Err(CogitoError::Config(format!(
            "Unknown tool '{}'. Available: web_search, python_repl",
            other
        ))),
    }
}

fn tool_set(names: &[String], settings: &Settings) -> Result<ToolSet> {
    let mut tools = ToolSet::new();
    for name in names {
        tools = tools.with(tool_by_name(name, settings)?);
    }
    Ok(tools)
}

/// The model an agent talks to.
///
/// `chat` prefers Azure OpenAI and falls back to OpenAI when Azure is not
/// configured; every other agent uses OpenAI.
pub fn model_for(kind: AgentKind, settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    if kind == AgentKind::Chat {
        match azure_config(&settings.azure) {
            Ok(_) => {
                let timeout = Duration::from_secs(settings.openai.timeout_secs);
                return Ok(Arc::new(AzureChatModel::from_azure_settings(&settings.azure, timeout)?));
            }
            Err(e) => warn!("Azure OpenAI unavailable ({}), using OpenAI", e),
        }
    }
    Ok(Arc::new(OpenAIChatModel::from_settings(&settings.openai)?))
}

/// Build an agent with the configured models and tools.
pub fn build_agent(kind: AgentKind, settings: &Settings, prompts: &Prompts) -> Result<Arc<dyn Agent>> {
    let model = model_for(kind, settings)?;
    build_agent_with_model(kind, model, settings, prompts)
}

/// Build an agent around an existing model.
pub fn build_agent_with_model(
    kind: AgentKind,
    model: Arc<dyn ChatModel>,
    settings: &Settings,
    prompts: &Prompts,
) -> Result<Arc<dyn Agent>> {
    info!("Building agent {} on {}", kind, model.model_name());
    let limit = settings.graph.recursion_limit;
    let name = kind.as_str();
    let description = kind.description();

    let agent: Arc<dyn Agent> = match kind {
        AgentKind::Chat => Arc::new(ChatAgent::new(name, description, chat_graph(model, limit)?)),
        AgentKind::SearchChat | AgentKind::ToolChat => {
            let tools = tool_set(&kind.tool_names(settings), settings)?;
            if tools.is_empty() {
                return Err(CogitoError::Config(format!("Agent {} has no tools configured", kind)));
            }
            Arc::new(ChatAgent::new(name, description, tool_chat_graph(model, tools, limit)?))
        }
        AgentKind::Crypto | AgentKind::CryptoCharts => {
            let prompts = crypto::PromptContext::new(Arc::new(prompts.clone()), &settings.crypto.api_base);
            let client = Arc::new(crypto::ApiClient::from_settings(&settings.crypto)?);
            let graph = if kind == AgentKind::Crypto {
                crypto_graph(model, prompts, client, limit)?
            } else {
                let tools = tool_set(&kind.tool_names(settings), settings)?;
                crypto_charts_graph(model, prompts, client, tools, limit)?
            };
            Arc::new(CryptoAgent::new(name, description, graph))
        }
    };
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockChatModel, MockReply};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn fake_tavily(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "results": [
                { "url": "https://news.example/btc", "content": format!("about {}", body["query"].as_str().unwrap_or_default()) }
            ]
        }))
    }

    async fn spawn_tavily() -> String {
        let app = Router::new().route("/search", post(fake_tavily));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/search", addr)
    }

    #[test]
    fn test_agent_kind_names() {
        for kind in AgentKind::all() {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), kind);
        }
        assert_eq!("Crypto-Charts".parse::<AgentKind>().unwrap(), AgentKind::CryptoCharts);
        assert!(matches!(
            "weather".parse::<AgentKind>(),
            Err(CogitoError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_tool_names_follow_settings() {
        let mut settings = Settings::default();
        settings.tool_chat.tools = vec!["python_repl".to_string()];
        assert_eq!(AgentKind::ToolChat.tool_names(&settings), vec!["python_repl"]);
        assert!(AgentKind::Crypto.tool_names(&settings).is_empty());
    }

    #[test]
    fn test_unknown_tool_is_config_error() {
        let err = tool_by_name("calculator", &Settings::default()).err().unwrap();
        assert!(err.to_string().contains("calculator"));
    }

    #[test]
    fn test_tool_chat_without_tools_is_rejected() {
        let mut settings = Settings::default();
        settings.tool_chat.tools.clear();
        let model = Arc::new(MockChatModel::new(Vec::new()));
        let result = build_agent_with_model(AgentKind::ToolChat, model, &settings, &Prompts::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_skips_tool_messages() {
        let output = AgentOutput {
            messages: vec![
                Message::user("q"),
                Message::assistant("first"),
                Message::tool("call_1", "echo", "result"),
            ],
            steps: Vec::new(),
            data: None,
        };
        assert_eq!(output.reply().unwrap().content, "first");
    }

    #[test]
    fn test_build_and_run_with_mock() {
        let model = Arc::new(MockChatModel::new(vec![MockReply::text("hey")]));
        let agent =
            build_agent_with_model(AgentKind::Chat, model, &Settings::default(), &Prompts::default()).unwrap();
        assert_eq!(agent.name(), "chat");

        let output = tokio_test::block_on(agent.invoke(vec![Message::user("hi")])).unwrap();
        assert_eq!(output.reply().unwrap().content, "hey");
    }

    #[tokio::test]
    async fn test_search_chat_searches_then_answers() {
        let mut settings = Settings::default();
        settings.tavily.api_key_env = "COGITO_TEST_REGISTRY_TAVILY_KEY".to_string();
        settings.tavily.endpoint = spawn_tavily().await;
        std::env::set_var("COGITO_TEST_REGISTRY_TAVILY_KEY", "tvly-test");

        let model = Arc::new(MockChatModel::new(vec![
            MockReply::tool_call("call_1", "web_search", json!({"query": "bitcoin news"})),
            MockReply::text("Bitcoin is in the news."),
        ]));
        let agent =
            build_agent_with_model(AgentKind::SearchChat, model.clone(), &settings, &Prompts::default()).unwrap();
        assert_eq!(agent.name(), "search_chat");

        let output = agent.invoke(vec![Message::user("what's new with btc?")]).await.unwrap();

        assert_eq!(output.steps, vec!["chatbot", "tools", "chatbot"]);
        let tool_message = output.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_message.content.contains("https://news.example/btc"));
        assert!(tool_message.content.contains("about bitcoin news"));
        assert_eq!(output.reply().unwrap().content, "Bitcoin is in the news.");
        assert_eq!(model.requests()[0].tools, vec!["web_search"]);
    }
}
