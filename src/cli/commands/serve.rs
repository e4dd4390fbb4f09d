//! HTTP API server for integration with other systems.
//!
//! Exposes the agents over REST. Threads keep a conversation in memory so
//! callers can continue it across requests.

use super::build_prompts;
use crate::agents::{build_agent, Agent, AgentKind, AgentOutput};
use crate::cli::Output;
use crate::config::Settings;
use crate::message::Message;
use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Stored conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub thread_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Thread {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            thread_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    agents: BTreeMap<String, Arc<dyn Agent>>,
    threads: RwLock<HashMap<Uuid, Thread>>,
    max_threads: usize,
}

impl AppState {
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            agents: agents.into_iter().map(|a| (a.name().to_string(), a)).collect(),
            threads: RwLock::new(HashMap::new()),
            max_threads: 1000,
        }
    }

    /// Cap the number of stored threads (at least one).
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.max(1);
        self
    }
}

/// CORS policy for the configured origins.
///
/// Returns `None` when no origin is configured, so browsers on other sites
/// cannot call the API at all.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        if origin.trim() == "*" {
            anyhow::bail!("server.allowed_origins cannot contain '*'; list each origin");
        }
        let value = HeaderValue::from_str(origin.trim())
            .map_err(|e| anyhow::anyhow!("Invalid origin '{}' in server.allowed_origins: {}", origin, e))?;
        allowed.push(value);
    }

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([CONTENT_TYPE]),
    ))
}

/// Routes of the API.
pub fn router(state: Arc<AppState>, cors: Option<CorsLayer>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/agents/{name}/invoke", post(invoke_agent))
        .route("/threads", post(create_thread))
        .route("/threads/{thread_id}", get(get_thread).delete(delete_thread));
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    app.with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let prompts = build_prompts(&settings)?;
    let cors = cors_layer(&settings.server.allowed_origins)?;

    let mut agents = Vec::new();
    for kind in AgentKind::all() {
        match build_agent(kind, &settings, &prompts) {
            Ok(agent) => agents.push(agent),
            Err(e) => {
                warn!("Agent {} unavailable: {}", kind, e);
                Output::warning(&format!("Skipping {}: {}", kind, e));
            }
        }
    }
    if agents.is_empty() {
        anyhow::bail!("No agent could be built. Run 'cogito doctor' for details.");
    }

    let names: Vec<String> = agents.iter().map(|a| a.name().to_string()).collect();
    let state = AppState::new(agents).with_max_threads(settings.server.max_threads);
    let app = router(Arc::new(state), cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Cogito API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Agents", &names.join(", "));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("List Agents", "GET  /agents");
    Output::kv("Invoke", "POST /agents/{name}/invoke");
    Output::kv("New Thread", "POST /threads");
    Output::kv("Get Thread", "GET  /threads/{thread_id}");
    Output::kv("Delete Thread", "DELETE /threads/{thread_id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct InvokeRequest {
    /// A single user message.
    #[serde(default)]
    input: Option<String>,
    /// Messages to send; `input` goes after them.
    #[serde(default)]
    messages: Vec<Message>,
    /// Continue a stored conversation.
    #[serde(default)]
    thread_id: Option<Uuid>,
}

impl InvokeRequest {
    /// New messages carried by the request.
    fn new_messages(self) -> Vec<Message> {
        let mut messages = self.messages;
        if let Some(input) = self.input.filter(|i| !i.trim().is_empty()) {
            messages.push(Message::user(input));
        }
        messages
    }
}

#[derive(Serialize)]
struct InvokeResponse {
    agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<Uuid>,
    reply: Option<String>,
    #[serde(flatten)]
    output: AgentOutput,
}

#[derive(Serialize)]
struct AgentInfo {
    name: String,
    description: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let agents: Vec<AgentInfo> = state
        .agents
        .values()
        .map(|a| AgentInfo {
            name: a.name().to_string(),
            description: a.description().to_string(),
        })
        .collect();
    Json(serde_json::json!({ "agents": agents }))
}

async fn create_thread(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let thread = Thread::new();
    let mut threads = state.threads.write().await;
    while threads.len() >= state.max_threads {
        let Some(oldest) = threads.values().min_by_key(|t| t.updated_at).map(|t| t.thread_id) else {
            break;
        };
        threads.remove(&oldest);
        info!("Evicted thread {}", oldest);
    }
    threads.insert(thread.thread_id, thread.clone());
    info!("Created thread {}", thread.thread_id);
    (StatusCode::CREATED, Json(thread))
}

async fn delete_thread(State(state): State<Arc<AppState>>, Path(thread_id): Path<Uuid>) -> Response {
    match state.threads.write().await.remove(&thread_id) {
        Some(_) => {
            info!("Deleted thread {}", thread_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => error(StatusCode::NOT_FOUND, format!("Thread not found: {}", thread_id)),
    }
}

async fn get_thread(State(state): State<Arc<AppState>>, Path(thread_id): Path<Uuid>) -> Response {
    match state.threads.read().await.get(&thread_id) {
        Some(thread) => Json(thread.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("Thread not found: {}", thread_id)),
    }
}

async fn invoke_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<InvokeRequest>,
) -> Response {
    let Some(agent) = state.agents.get(&name).cloned() else {
        return error(StatusCode::NOT_FOUND, format!("Unknown agent: {}", name));
    };

    let thread_id = req.thread_id;
    let new_messages = req.new_messages();
    if new_messages.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Request needs 'input' or 'messages'");
    }

    let mut messages = match thread_id {
        Some(id) => match state.threads.read().await.get(&id) {
            Some(thread) => thread.messages.clone(),
            None => return error(StatusCode::NOT_FOUND, format!("Thread not found: {}", id)),
        },
        None => Vec::new(),
    };
    messages.extend(new_messages);

    let output = match agent.invoke(messages).await {
        Ok(output) => output,
        Err(e) => {
            warn!("Agent {} failed: {}", name, e);
            return error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    if let Some(id) = thread_id {
        // Concurrent runs on one thread: the last one to finish wins.
        if let Some(thread) = state.threads.write().await.get_mut(&id) {
            thread.messages = output.messages.clone();
            thread.updated_at = Utc::now();
        }
    }

    Json(InvokeResponse {
        agent: name,
        thread_id,
        reply: output.reply().map(|m| m.content.clone()),
        output,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{chat_graph, ChatAgent};
    use crate::config::ServerSettings;
    use crate::llm::{MockChatModel, MockReply};
    use serde_json::{json, Value};

    async fn spawn(replies: Vec<MockReply>) -> (String, Arc<MockChatModel>) {
        spawn_with(replies, &ServerSettings::default()).await
    }

    async fn spawn_with(replies: Vec<MockReply>, server: &ServerSettings) -> (String, Arc<MockChatModel>) {
        let model = Arc::new(MockChatModel::new(replies));
        let agent: Arc<dyn Agent> = Arc::new(ChatAgent::new(
            "chat",
            "Plain chat",
            chat_graph(model.clone(), 25).unwrap(),
        ));
        let state = AppState::new(vec![agent]).with_max_threads(server.max_threads);
        let app = router(Arc::new(state), cors_layer(&server.allowed_origins).unwrap());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), model)
    }

    #[tokio::test]
    async fn test_health_and_agents() {
        let (base, _) = spawn(Vec::new()).await;
        let client = reqwest::Client::new();

        let health: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(health["status"], "ok");

        let agents: Value = client.get(format!("{}/agents", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(agents["agents"][0]["name"], "chat");
    }

    #[tokio::test]
    async fn test_invoke_without_thread() {
        let (base, _) = spawn(vec![MockReply::text("pong")]).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/agents/chat/invoke", base))
            .json(&json!({ "input": "ping" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["reply"], "pong");
        assert_eq!(body["steps"], json!(["chatbot"]));
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert!(body.get("thread_id").is_none());
    }

    #[tokio::test]
    async fn test_thread_continues_conversation() {
        let (base, model) = spawn(vec![MockReply::text("Hi Ann"), MockReply::text("You are Ann")]).await;
        let client = reqwest::Client::new();

        let thread: Value = client
            .post(format!("{}/threads", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let thread_id = thread["thread_id"].as_str().unwrap().to_string();

        for input in ["I am Ann", "Who am I?"] {
            let response = client
                .post(format!("{}/agents/chat/invoke", base))
                .json(&json!({ "input": input, "thread_id": thread_id }))
                .send()
                .await
                .unwrap();
            assert!(response.status().is_success());
        }

        assert_eq!(model.requests()[1].messages.len(), 3);

        let stored: Value = client
            .get(format!("{}/threads/{}", base, thread_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stored["messages"].as_array().unwrap().len(), 4);
        assert_eq!(stored["messages"][3]["content"], "You are Ann");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (base, _) = spawn(Vec::new()).await;
        let client = reqwest::Client::new();

        let unknown_agent = client
            .post(format!("{}/agents/nope/invoke", base))
            .json(&json!({ "input": "hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown_agent.status(), reqwest::StatusCode::NOT_FOUND);

        let empty = client
            .post(format!("{}/agents/chat/invoke", base))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

        let unknown_thread = client
            .get(format!("{}/threads/{}", base, Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown_thread.status(), reqwest::StatusCode::NOT_FOUND);

        // Empty script: the model call fails.
        let failing = client
            .post(format!("{}/agents/chat/invoke", base))
            .json(&json!({ "input": "hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(failing.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = failing.json().await.unwrap();
        assert!(body["error"].as_str().is_some());
    }

    async fn preflight(client: &reqwest::Client, base: &str, origin: &str) -> reqwest::Response {
        client
            .request(reqwest::Method::OPTIONS, format!("{}/agents/chat/invoke", base))
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cross_origin_refused_by_default() {
        let (base, model) = spawn(vec![MockReply::text("pong")]).await;
        let client = reqwest::Client::new();

        let response = preflight(&client, &base, "https://evil.example").await;
        assert!(response.headers().get("access-control-allow-origin").is_none());

        // A form-style POST needs no preflight, so it must not reach the agent.
        let simple = client
            .post(format!("{}/agents/chat/invoke", base))
            .header("origin", "https://evil.example")
            .header("content-type", "text/plain")
            .body(r#"{"input":"ping"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(simple.status(), reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(simple.headers().get("access-control-allow-origin").is_none());
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_only_configured_origins_allowed() {
        let server = ServerSettings {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            ..ServerSettings::default()
        };
        let (base, _) = spawn_with(Vec::new(), &server).await;
        let client = reqwest::Client::new();

        let allowed = preflight(&client, &base, "http://localhost:3000").await;
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );

        let refused = preflight(&client, &base, "https://evil.example").await;
        assert!(refused.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_invalid_origins_rejected() {
        assert!(cors_layer(&["*".to_string()]).is_err());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
        assert!(cors_layer(&[]).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_least_recently_updated_thread_evicted() {
        let server = ServerSettings {
            max_threads: 2,
            ..ServerSettings::default()
        };
        let (base, _) = spawn_with(vec![MockReply::text("noted")], &server).await;
        let client = reqwest::Client::new();

        let mut ids = Vec::new();
        for _ in 0..2 {
            let thread: Value = client
                .post(format!("{}/threads", base))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            ids.push(thread["thread_id"].as_str().unwrap().to_string());
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        // Touch the first thread so the second becomes the stalest.
        let response = client
            .post(format!("{}/agents/chat/invoke", base))
            .json(&json!({ "input": "remember me", "thread_id": ids[0] }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let third = client.post(format!("{}/threads", base)).send().await.unwrap();
        assert_eq!(third.status(), reqwest::StatusCode::CREATED);

        let status = |id: &str| {
            let request = client.get(format!("{}/threads/{}", base, id));
            async move { request.send().await.unwrap().status() }
        };
        assert_eq!(status(&ids[0]).await, reqwest::StatusCode::OK);
        assert_eq!(status(&ids[1]).await, reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let (base, _) = spawn(Vec::new()).await;
        let client = reqwest::Client::new();

        let thread: Value = client
            .post(format!("{}/threads", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let url = format!("{}/threads/{}", base, thread["thread_id"].as_str().unwrap());

        let deleted = client.delete(&url).send().await.unwrap();
        assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

        let gone = client.get(&url).send().await.unwrap();
        assert_eq!(gone.status(), reqwest::StatusCode::NOT_FOUND);

        let again = client.delete(&url).send().await.unwrap();
        assert_eq!(again.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
