//! Error types for Cogito.

use thiserror::Error;

/// Library-level error type for Cogito operations.
#[derive(Error, Debug)]
pub enum CogitoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph compilation failed: {0}")]
    GraphCompile(String),

    #[error("Graph execution failed: {0}")]
    Graph(String),

    #[error("Recursion limit of {0} reached without hitting the end node")]
    RecursionLimit(usize),

    #[error("Router for node '{node}' returned unknown route '{route}'")]
    UnknownRoute { node: String, route: String },

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("API call failed: {0}")]
    ApiCall(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Cogito operations.
pub type Result<T> = std::result::Result<T, CogitoError>;
