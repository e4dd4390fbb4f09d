//! Executable graph.

use super::node::{GraphState, Node, Router};
use super::{END, START};
use crate::error::{CogitoError, Result};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Outgoing edge of a node.
pub(super) enum Edge<S> {
    Direct(String),
    Conditional {
        router: Router<S>,
        paths: HashMap<String, String>,
    },
}

/// A validated graph, ready to run.
pub struct CompiledGraph<S: GraphState> {
    pub(super) nodes: HashMap<String, Box<dyn Node<S>>>,
    pub(super) edges: HashMap<String, Edge<S>>,
    pub(super) recursion_limit: usize,
}

impl<S: GraphState> CompiledGraph<S> {
    /// Run the graph from the start node until the end node.
    pub async fn invoke(&self, state: S) -> Result<S> {
        self.invoke_traced(state).await.map(|(state, _)| state)
    }

    /// Run the graph and also return the ids of the nodes visited, in order.
    #[instrument(skip(self, state), fields(recursion_limit = self.recursion_limit))]
    pub async fn invoke_traced(&self, mut state: S) -> Result<(S, Vec<String>)> {
        let mut visited = Vec::new();
        let mut current = self.next_node(START, &state)?;

        while current != END {
            if visited.len() >= self.recursion_limit {
                return Err(CogitoError::RecursionLimit(self.recursion_limit));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| CogitoError::Graph(format!("node '{}' is not registered", current)))?;

            debug!("Running node {}", current);
            let update = node.run(&state).await?;
            state.apply(update);
            visited.push(current.clone());

            current = self.next_node(&current, &state)?;
        }

        debug!("Graph finished after {} step(s)", visited.len());
        Ok((state, visited))
    }

    /// Ids of all registered nodes, sorted.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    fn next_node(&self, from: &str, state: &S) -> Result<String> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| CogitoError::Graph(format!("node '{}' has no outgoing edge", from)))?;

        match edge {
            Edge::Direct(to) => Ok(to.clone()),
            Edge::Conditional { router, paths } => {
                let route = router(state)?;
                debug!("Router after {} chose {}", from, route);
                paths.get(&route).cloned().ok_or_else(|| CogitoError::UnknownRoute {
                    node: from.to_string(),
                    route,
                })
            }
        }
    }
}
