//! Crypto research agents.
//!
//! The model loops between deciding and fetching market data until it has
//! enough to answer:
//!
//! ```text
//! START -> crypto_agent -> create_api_call -> retrieve_data_from_api -> crypto_agent
//!          crypto_agent -> generate -> END
//! ```
//!
//! The charts variant binds a code execution tool to `generate` and loops
//! `generate -> python_repl -> generate` until the model stops calling it.

mod api;
mod nodes;
mod state;

pub use api::ApiClient;
pub use nodes::{route_decision, CreateApiCallNode, DecideNode, GenerateNode, PromptContext, RetrieveDataNode};
pub use state::{ApiCall, CryptoState, CryptoUpdate, Decision};

use super::{Agent, AgentOutput};
use crate::error::Result;
use crate::graph::{CompiledGraph, StateGraph, END, START};
use crate::llm::ChatModel;
use crate::message::Message;
use crate::tools::{route_tools, ToolNode, ToolSet};
use async_trait::async_trait;
use std::sync::Arc;

fn decision_paths() -> [(&'static str, &'static str); 2] {
    [
        (Decision::CreateApiCall.as_str(), "create_api_call"),
        (Decision::Generate.as_str(), "generate"),
    ]
}

fn add_research_loop(
    graph: &mut StateGraph<CryptoState>,
    model: &Arc<dyn ChatModel>,
    prompts: &PromptContext,
    client: Arc<ApiClient>,
) {
    graph
        .add_node("crypto_agent", DecideNode::new(model.clone(), prompts.clone()))
        .add_node("create_api_call", CreateApiCallNode::new(model.clone(), prompts.clone()))
        .add_node("retrieve_data_from_api", RetrieveDataNode::new(client))
        .add_edge(START, "crypto_agent")
        .add_conditional_edges("crypto_agent", route_decision, decision_paths())
        .add_edge("create_api_call", "retrieve_data_from_api")
        .add_edge("retrieve_data_from_api", "crypto_agent");
}

/// Research loop ending in a plain text answer.
pub fn crypto_graph(
    model: Arc<dyn ChatModel>,
    prompts: PromptContext,
    client: Arc<ApiClient>,
    recursion_limit: usize,
) -> Result<CompiledGraph<CryptoState>> {
    let mut graph = StateGraph::new().with_recursion_limit(recursion_limit);
    add_research_loop(&mut graph, &model, &prompts, client);
    graph
        .add_node("generate", GenerateNode::new(model, prompts))
        .add_edge("generate", END);
    graph.compile()
}

/// Research loop whose answer step may run code through `tools` to draw charts.
pub fn crypto_charts_graph(
    model: Arc<dyn ChatModel>,
    prompts: PromptContext,
    client: Arc<ApiClient>,
    tools: ToolSet,
    recursion_limit: usize,
) -> Result<CompiledGraph<CryptoState>> {
    let mut graph = StateGraph::new().with_recursion_limit(recursion_limit);
    add_research_loop(&mut graph, &model, &prompts, client);
    graph
        .add_node("generate", GenerateNode::new(model, prompts).with_tools(tools.specs()))
        .add_node("python_repl", ToolNode::new(tools))
        .add_conditional_edges(
            "generate",
            route_tools::<CryptoState>("python_repl"),
            [("python_repl", "python_repl"), (END, END)],
        )
        .add_edge("python_repl", "generate");
    graph.compile()
}

/// A compiled crypto graph exposed as an [`Agent`].
pub struct CryptoAgent {
    name: String,
    description: String,
    graph: CompiledGraph<CryptoState>,
}

impl CryptoAgent {
    pub fn new(name: &str, description: &str, graph: CompiledGraph<CryptoState>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            graph,
        }
    }
}

#[async_trait]
impl Agent for CryptoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, messages: Vec<Message>) -> Result<AgentOutput> {
        let (state, steps) = self.graph.invoke_traced(CryptoState::new(messages)).await?;
        Ok(AgentOutput {
            messages: state.messages,
            steps,
            data: Some(state.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::error::CogitoError;
    use crate::llm::{MockChatModel, MockReply};
    use crate::tools::testing::Echo;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    async fn simple_price(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        let id = q.get("ids").cloned().unwrap_or_default();
        Json(json!({ id: { "usd": 64000 } }))
    }

    async fn spawn_market() -> String {
        let app = Router::new().route("/api/v3/simple/price", get(simple_price));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/v3", addr)
    }

    fn parts(base: &str) -> (PromptContext, Arc<ApiClient>) {
        let prompts = PromptContext::new(Arc::new(Prompts::default()), base);
        let client = Arc::new(ApiClient::new(Duration::from_secs(5)).unwrap());
        (prompts, client)
    }

    #[tokio::test]
    async fn test_fetches_then_answers() {
        let base = spawn_market().await;
        let model = Arc::new(MockChatModel::new(vec![
            MockReply::text("create_api_call"),
            MockReply::Structured(json!({
                "url": format!("{}/simple/price?ids=bitcoin&vs_currencies=usd", base),
                "method": "GET"
            })),
            MockReply::text("generate"),
            MockReply::text("Bitcoin trades at $64,000."),
        ]));
        let (prompts, client) = parts(&base);
        let agent = CryptoAgent::new(
            "crypto",
            "Crypto research",
            crypto_graph(model.clone(), prompts, client, 25).unwrap(),
        );

        let output = agent.invoke(vec![Message::user("What is BTC worth?")]).await.unwrap();

        assert_eq!(
            output.steps,
            vec!["crypto_agent", "create_api_call", "retrieve_data_from_api", "crypto_agent", "generate"]
        );
        assert_eq!(output.data, Some(json!({ "bitcoin": { "usd": 64000 } })));
        assert_eq!(
            output.reply().map(|m| m.content.as_str()),
            Some("Bitcoin trades at $64,000.")
        );

        // The second decision sees the fetched data.
        let requests = model.requests();
        assert!(requests[2].messages[0].content.contains("\"usd\": 64000"));
        assert_eq!(model.remaining(), 0);
    }

    #[tokio::test]
    async fn test_answers_directly() {
        let model = Arc::new(MockChatModel::new(vec![
            MockReply::text("generate"),
            MockReply::text("Hello, ask me about coins."),
        ]));
        let (prompts, client) = parts("https://api.coingecko.com/api/v3");
        let graph = crypto_graph(model, prompts, client, 25).unwrap();

        let (state, steps) = graph
            .invoke_traced(CryptoState::new(vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(steps, vec!["crypto_agent", "generate"]);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.data, json!({}));
    }

    #[tokio::test]
    async fn test_unknown_decision_fails_the_run() {
        let model = Arc::new(MockChatModel::new(vec![MockReply::text("browse")]));
        let (prompts, client) = parts("https://api.coingecko.com/api/v3");
        let graph = crypto_graph(model, prompts, client, 25).unwrap();

        let err = graph.invoke(CryptoState::new(vec![Message::user("hi")])).await.unwrap_err();
        assert!(matches!(err, CogitoError::Agent(_)));
    }

    #[tokio::test]
    async fn test_endless_fetching_hits_recursion_limit() {
        let base = spawn_market().await;
        let mut replies = Vec::new();
        for _ in 0..5 {
            replies.push(MockReply::text("create_api_call"));
            replies.push(MockReply::Structured(json!({
                "url": format!("{}/simple/price?ids=eth", base)
            })));
        }
        let model = Arc::new(MockChatModel::new(replies));
        let (prompts, client) = parts(&base);
        let graph = crypto_graph(model, prompts, client, 6).unwrap();

        let err = graph.invoke(CryptoState::new(vec![Message::user("eth?")])).await.unwrap_err();
        assert!(matches!(err, CogitoError::RecursionLimit(6)));
    }

    #[tokio::test]
    async fn test_charts_graph_runs_tool_then_answers() {
        let model = Arc::new(MockChatModel::new(vec![
            MockReply::text("generate"),
            MockReply::tool_call("call_1", "echo", json!({"text": "chart saved"})),
            MockReply::text("Here is your chart."),
        ]));
        let (prompts, client) = parts("https://api.coingecko.com/api/v3");
        let tools = ToolSet::new().with(Arc::new(Echo));
        let graph = crypto_charts_graph(model.clone(), prompts, client, tools, 25).unwrap();

        let (state, steps) = graph
            .invoke_traced(CryptoState::new(vec![Message::user("plot btc")]))
            .await
            .unwrap();

        assert_eq!(steps, vec!["crypto_agent", "generate", "python_repl", "generate"]);
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[2].content, "chart saved");
        assert_eq!(state.messages[3].content, "Here is your chart.");

        // The second answer attempt sees the tool output in its transcript.
        let requests = model.requests();
        assert!(requests[2].messages[0].content.contains("chart saved"));
        assert_eq!(requests[2].tools, vec!["echo"]);
    }
}
