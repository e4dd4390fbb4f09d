//! End-to-end runs of the agents against a scripted model and a local market API.

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use cogito::agents::{build_agent_with_model, AgentKind};
use cogito::config::{Prompts, Settings};
use cogito::llm::{MockChatModel, MockReply};
use cogito::message::{Message, Role};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

async fn market_chart(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let authorized = headers.get("x-cg-demo-api-key").is_some();
    Json(json!({
        "id": q.get("id"),
        "authorized": authorized,
        "prices": [[1700000000000u64, 35000.0], [1700086400000u64, 36000.0]]
    }))
}

async fn spawn_market() -> String {
    let app = Router::new().route("/api/v3/coins/bitcoin/market_chart", get(market_chart));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v3", addr)
}

fn settings_for(api_base: &str) -> Settings {
    let mut settings = Settings::default();
    settings.crypto.api_base = api_base.to_string();
    settings.crypto.api_key_env = "COGITO_IT_MARKET_KEY".to_string();
    settings.python_repl.interpreter = "sh".to_string();
    settings.tool_chat.tools = vec!["python_repl".to_string()];
    settings
}

#[tokio::test]
async fn crypto_agent_fetches_with_key_and_answers() {
    std::env::set_var("COGITO_IT_MARKET_KEY", "demo-key");
    let base = spawn_market().await;
    let settings = settings_for(&base);

    let model = Arc::new(MockChatModel::new(vec![
        MockReply::text("'create_api_call'"),
        MockReply::Structured(json!({
            "url": format!("{}/coins/bitcoin/market_chart?id=bitcoin&days=1", base),
            "method": "GET",
            "headers": {},
            "body": {}
        })),
        MockReply::text("generate."),
        MockReply::text("Bitcoin rose from 35k to 36k."),
    ]));
    let agent = build_agent_with_model(AgentKind::Crypto, model.clone(), &settings, &Prompts::default()).unwrap();

    let output = agent.invoke(vec![Message::user("How did BTC do today?")]).await.unwrap();

    let data = output.data.clone().unwrap();
    assert_eq!(data["authorized"], true);
    assert_eq!(data["prices"].as_array().unwrap().len(), 2);
    assert_eq!(output.reply().unwrap().content, "Bitcoin rose from 35k to 36k.");
    assert_eq!(output.steps.len(), 5);

    // Prompts carry the configured API base.
    assert!(model.requests()[0].messages[0].content.contains(&base));
}

#[cfg(unix)]
#[tokio::test]
async fn crypto_charts_agent_runs_code_before_answering() {
    let settings = settings_for("https://api.coingecko.com/api/v3");
    let model = Arc::new(MockChatModel::new(vec![
        MockReply::text("generate"),
        MockReply::tool_call("call_1", "python_repl", json!({"code": "echo chart.png"})),
        MockReply::text("Chart saved as chart.png."),
    ]));
    let agent =
        build_agent_with_model(AgentKind::CryptoCharts, model.clone(), &settings, &Prompts::default()).unwrap();

    let output = agent.invoke(vec![Message::user("Plot BTC")]).await.unwrap();

    assert_eq!(output.steps, vec!["crypto_agent", "generate", "python_repl", "generate"]);
    let tool_message = output.messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_message.content.starts_with("Successfully executed:"));
    assert!(tool_message.content.contains("Stdout: chart.png"));
    assert_eq!(model.requests()[1].tools, vec!["python_repl"]);
}

#[cfg(unix)]
#[tokio::test]
async fn tool_chat_uses_configured_tools() {
    let settings = settings_for("https://api.coingecko.com/api/v3");
    let model = Arc::new(MockChatModel::new(vec![
        MockReply::tool_call("call_1", "python_repl", json!({"code": "echo 42"})),
        MockReply::tool_call("call_2", "web_search", json!({"query": "btc"})),
        MockReply::text("The answer is 42."),
    ]));
    let agent = build_agent_with_model(AgentKind::ToolChat, model.clone(), &settings, &Prompts::default()).unwrap();

    let output = agent.invoke(vec![Message::user("What is 6*7?")]).await.unwrap();

    assert_eq!(output.steps, vec!["chatbot", "tools", "chatbot", "tools", "chatbot"]);
    let tool_messages: Vec<&Message> = output.messages.iter().filter(|m| m.role == Role::Tool).collect();
    assert!(tool_messages[0].content.contains("Stdout: 42"));
    // Only python_repl is bound, so the search call is answered with an error.
    assert!(tool_messages[1].content.contains("web_search is not a valid tool"));
    assert_eq!(output.reply().unwrap().content, "The answer is 42.");
}
