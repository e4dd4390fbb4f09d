//! Interactive chat command.

use super::prepare_agent;
use crate::agents::Agent;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::message::Message;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(agent: &str, settings: Settings) -> anyhow::Result<()> {
    let agent = prepare_agent(agent, &settings)?;
    let mut session = ChatSession::new(agent);

    println!("\n{}", style(format!("Cogito Chat ({})", session.agent.name())).bold().cyan());
    println!(
        "{}\n",
        style("Type your message, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.send_message(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => Output::reply(session.agent.name(), &response),
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}

/// Conversation with an agent that keeps its history between turns.
struct ChatSession {
    agent: Arc<dyn Agent>,
    messages: Vec<Message>,
}

impl ChatSession {
    fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            messages: Vec::new(),
        }
    }

    fn clear_history(&mut self) {
        self.messages.clear();
    }

    /// Send a message and return the reply. A failed turn leaves the history untouched.
    async fn send_message(&mut self, user_input: &str) -> Result<String> {
        let mut messages = self.messages.clone();
        messages.push(Message::user(user_input));

        let output = self.agent.invoke(messages).await?;
        debug!("Turn took {} step(s)", output.steps.len());

        let reply = output.reply().map(|m| m.content.clone()).unwrap_or_default();
        self.messages = output.messages;
        Ok(reply)
    }
}
