//! Pre-flight checks before running an agent.
//!
//! Validates that the API keys and tools an agent needs are available
//! before starting a run that would otherwise fail midway.

use crate::agents::AgentKind;
use crate::config::Settings;
use crate::error::{CogitoError, Result};
use crate::openai::{azure_config, env_value, openai_api_key, FALLBACK_API_KEY_ENV};
use std::process::Command;

/// Run pre-flight checks for `agent`.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(agent: AgentKind, settings: &Settings) -> Result<()> {
    let uses_azure = agent == AgentKind::Chat && azure_config(&settings.azure).is_ok();
    if !uses_azure {
        check_openai_key(settings)?;
    }

    for tool in agent.tool_names(settings) {
        match tool.as_str() {
            "web_search" => check_env(&settings.tavily.api_key_env, "tvly-...")?,
            "python_repl" => check_interpreter(&settings.python_repl.interpreter)?,
            other => {
                return Err(CogitoError::Config(format!("Unknown tool '{}' in configuration", other)));
            }
        }
    }
    Ok(())
}

/// Check that an OpenAI API key is configured.
fn check_openai_key(settings: &Settings) -> Result<()> {
    match openai_api_key(&settings.openai) {
        Some(_) => Ok(()),
        None => Err(CogitoError::Config(format!(
            "No OpenAI API key. Set it with: export {}='sk-...' (or {})",
            settings.openai.api_key_env, FALLBACK_API_KEY_ENV
        ))),
    }
}

/// Check that an environment variable holds a value.
fn check_env(name: &str, example: &str) -> Result<()> {
    match env_value(name) {
        Some(_) => Ok(()),
        None => Err(CogitoError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            name, name, example
        ))),
    }
}

/// Check that the code interpreter runs.
pub fn check_interpreter(interpreter: &str) -> Result<()> {
    match Command::new(interpreter).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(CogitoError::Config(format!(
            "{} is installed but not working correctly",
            interpreter
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CogitoError::Config(format!("Interpreter not found: {}", interpreter)))
        }
        Err(e) => Err(CogitoError::Config(format!("{}: {}", interpreter, e))),
    }
}
