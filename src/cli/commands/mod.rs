//! CLI command implementations.

mod agent;
mod chat;
mod config;
mod doctor;
mod list;
mod serve;

pub use agent::run_agent;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::run_list;
pub use serve::{router, run_serve, AppState, Thread};

use crate::agents::{build_agent, Agent, AgentKind};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use std::sync::Arc;

/// Load prompt templates with the configured overrides.
pub(crate) fn build_prompts(settings: &Settings) -> crate::error::Result<Prompts> {
    Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )
}

/// Resolve an agent name, run the pre-flight checks and build the agent.
pub(crate) fn prepare_agent(name: &str, settings: &Settings) -> anyhow::Result<Arc<dyn Agent>> {
    let kind: AgentKind = match name.parse() {
        Ok(kind) => kind,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'cogito list' to see the available agents.");
            return Err(e.into());
        }
    };

    if let Err(e) = preflight::check(kind, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'cogito doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let prompts = build_prompts(settings)?;
    Ok(build_agent(kind, settings, &prompts)?)
}
