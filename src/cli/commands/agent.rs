//! Run command implementation.

use super::prepare_agent;
use crate::cli::Output;
use crate::config::Settings;
use crate::message::Message;
use anyhow::Result;

/// Send one message to an agent and print the answer.
pub async fn run_agent(agent: &str, message: &str, show_steps: bool, json: bool, settings: Settings) -> Result<()> {
    let agent = prepare_agent(agent, &settings)?;

    let spinner = Output::spinner(&format!("{} working...", agent.name()));
    let result = agent.invoke(vec![Message::user(message)]).await;
    spinner.finish_and_clear();

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match output.reply() {
        Some(reply) => Output::reply(agent.name(), &reply.content),
        None => Output::warning("The agent finished without replying."),
    }

    if show_steps {
        for message in output.messages.iter().filter(|m| m.has_tool_calls()) {
            for call in &message.tool_calls {
                Output::kv("tool call", &truncate(&call.to_string(), 80));
            }
        }
        Output::steps(&output.steps);
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
