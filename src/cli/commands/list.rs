//! List command implementation.

use crate::agents::AgentKind;
use crate::cli::Output;
use crate::config::Settings;

/// Run the list command.
pub fn run_list(settings: &Settings) {
    Output::header(&format!("Agents ({})", AgentKind::all().len()));
    println!();

    for kind in AgentKind::all() {
        Output::agent_info(kind.as_str(), kind.description(), &kind.tool_names(settings));
    }

    println!();
    Output::info("Run one with: cogito run <agent> \"<message>\"");
}
