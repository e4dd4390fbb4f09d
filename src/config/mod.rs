//! Configuration module for Cogito.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{CryptoPrompts, Prompts};
pub use settings::{
    AzureSettings, CryptoSettings, GeneralSettings, GraphSettings, OpenAISettings, PromptSettings,
    PythonReplSettings, ServerSettings, Settings, TavilySettings, ToolChatSettings,
};
