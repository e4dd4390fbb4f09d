//! Graph builder.

use super::compiled::{CompiledGraph, Edge};
use super::node::{GraphState, Node, Router};
use super::{DEFAULT_RECURSION_LIMIT, END, START};
use crate::error::{CogitoError, Result};
use std::collections::HashMap;

/// Builder for a state graph.
///
/// Register nodes with [`add_node`](Self::add_node), wire them with direct or
/// conditional edges, then [`compile`](Self::compile). All structural errors
/// are reported by `compile`, never by the builder methods.
pub struct StateGraph<S: GraphState> {
    nodes: Vec<(String, Box<dyn Node<S>>)>,
    edges: Vec<(String, Edge<S>)>,
    recursion_limit: usize,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Maximum number of node executions per invocation.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Register a node under `id`.
    pub fn add_node(&mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> &mut Self {
        self.nodes.push((id.into(), Box::new(node)));
        self
    }

    /// Always go from `from` to `to`.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// After `from`, call `router` and go to the node its result maps to in `paths`.
    pub fn add_conditional_edges<F, I, K, V>(&mut self, from: impl Into<String>, router: F, paths: I) -> &mut Self
    where
        F: Fn(&S) -> Result<String> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let router: Router<S> = Box::new(router);
        let paths = paths
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.edges.push((from.into(), Edge::Conditional { router, paths }));
        self
    }

    /// Validate the structure and produce an executable graph.
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        let mut nodes: HashMap<String, Box<dyn Node<S>>> = HashMap::new();
        for (id, node) in self.nodes {
            if id == START || id == END {
                return Err(CogitoError::GraphCompile(format!("'{}' is a reserved node id", id)));
            }
            if nodes.insert(id.clone(), node).is_some() {
                return Err(CogitoError::GraphCompile(format!("node '{}' is defined twice", id)));
            }
        }

        let mut edges: HashMap<String, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if from == END {
                return Err(CogitoError::GraphCompile("the end node cannot have outgoing edges".to_string()));
            }
            if from != START && !nodes.contains_key(&from) {
                return Err(CogitoError::GraphCompile(format!("edge starts at unknown node '{}'", from)));
            }

            let targets: Vec<&String> = match &edge {
                Edge::Direct(to) => vec![to],
                Edge::Conditional { paths, .. } => {
                    if paths.is_empty() {
                        return Err(CogitoError::GraphCompile(format!(
                            "conditional edge from '{}' has an empty path map",
                            from
                        )));
                    }
                    paths.values().collect()
                }
            };
            for to in targets {
                if to != END && !nodes.contains_key(to) {
                    return Err(CogitoError::GraphCompile(format!(
                        "edge from '{}' points to unknown node '{}'",
                        from, to
                    )));
                }
            }

            if edges.insert(from.clone(), edge).is_some() {
                return Err(CogitoError::GraphCompile(format!(
                    "node '{}' has more than one outgoing edge definition",
                    from
                )));
            }
        }

        if !edges.contains_key(START) {
            return Err(CogitoError::GraphCompile("no edge from the start node".to_string()));
        }
        for id in nodes.keys() {
            if !edges.contains_key(id) {
                return Err(CogitoError::GraphCompile(format!("node '{}' has no outgoing edge", id)));
            }
        }

        Ok(CompiledGraph {
            nodes,
            edges,
            recursion_limit: self.recursion_limit,
        })
    }
}
