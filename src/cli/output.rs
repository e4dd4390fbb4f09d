//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an agent entry.
    pub fn agent_info(name: &str, description: &str, tools: &[String]) {
        let tools = if tools.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tools.join(", "))
        };
        println!(
            "  {} {} - {}{}",
            style("*").cyan(),
            style(name).bold(),
            description,
            style(tools).dim()
        );
    }

    /// Print the visited graph nodes.
    pub fn steps(steps: &[String]) {
        println!("{} {}", style("steps:").dim(), style(steps.join(" -> ")).dim());
    }

    /// Print an agent reply.
    pub fn reply(agent: &str, content: &str) {
        println!("\n{} {}\n", style(format!("{}:", agent)).cyan().bold(), content);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
