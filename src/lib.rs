//! Cogito - small LLM agent graphs
//!
//! A handful of conversational agents built as state graphs over chat models.
//!
//! # Overview
//!
//! Cogito ships five agents:
//! - `chat` - a plain chatbot
//! - `search_chat` - a chatbot that can search the web
//! - `tool_chat` - a chatbot bound to a configurable set of tools
//! - `crypto` - a crypto expert that fetches market data before answering
//! - `crypto_charts` - the same expert, able to draw charts by running Python
//!
//! # Architecture
//!
//! - `message` - Conversation messages and the history reducer
//! - `graph` - State graph builder and runner
//! - `llm` - Chat model abstraction (OpenAI, Azure OpenAI, scripted mock)
//! - `tools` - Tools the models can call, and the node that runs them
//! - `agents` - The agent graphs and the registry that builds them
//! - `config` - Configuration management and prompt templates
//! - `cli` - Command line and HTTP surfaces
//!
//! # Example
//!
//! ```rust,no_run
//! use cogito::agents::{build_agent, AgentKind};
//! use cogito::config::{Prompts, Settings};
//! use cogito::message::Message;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::load(settings.prompts.custom_dir.as_deref(), Some(&settings.prompts.variables))?;
//!     let agent = build_agent(AgentKind::Crypto, &settings, &prompts)?;
//!
//!     let output = agent.invoke(vec![Message::user("What is bitcoin trading at?")]).await?;
//!     if let Some(reply) = output.reply() {
//!         println!("{}", reply.content);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod openai;
pub mod tools;

pub use error::{CogitoError, Result};
