//! Minimal state graph runner.
//!
//! Nodes read the current state and return a partial update, the runner
//! merges the update and follows either a direct edge or a router's choice
//! until it reaches [`END`].

mod compiled;
mod node;
mod state_graph;

pub use compiled::CompiledGraph;
pub use node::{GraphState, MessagesState, Node, Router};
pub use state_graph::StateGraph;

/// Virtual entry node.
pub const START: &str = "__start__";

/// Virtual exit node.
pub const END: &str = "__end__";

/// Default maximum number of node executions per invocation.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;
