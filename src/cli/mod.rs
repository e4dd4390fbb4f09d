//! CLI module for Cogito.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Cogito - small LLM agent graphs
///
/// Run chat, web search, code execution and crypto market agents from the
/// terminal or over HTTP.
#[derive(Parser, Debug)]
#[command(name = "cogito")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COGITO_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available agents
    List,

    /// Send one message to an agent and print its answer
    Run {
        /// Agent name (see `cogito list`)
        agent: String,

        /// The message to send
        message: String,

        /// Print the graph nodes visited
        #[arg(long)]
        show_steps: bool,

        /// Print the full run as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat session with an agent
    Chat {
        /// Agent name (see `cogito list`)
        agent: String,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check API keys, tools and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
