//! Node and state traits.

use crate::error::Result;
use crate::message::Message;
use async_trait::async_trait;

/// State carried through a graph.
///
/// Nodes never overwrite the state directly; they return an `Update` that the
/// state knows how to merge into itself.
pub trait GraphState: Clone + Send + Sync + 'static {
    /// Partial update produced by a node.
    type Update: Send + 'static;

    /// Merge a node's update into the state.
    fn apply(&mut self, update: Self::Update);
}

/// State that carries a conversation history.
pub trait MessagesState: GraphState {
    /// Current message history.
    fn messages(&self) -> &[Message];

    /// An update that only adds (or replaces) messages.
    fn messages_update(messages: Vec<Message>) -> Self::Update;
}

/// One step of a graph.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Read the state and produce an update.
    async fn run(&self, state: &S) -> Result<S::Update>;
}

/// Routing function for conditional edges. Returns a key of the edge's path map.
pub type Router<S> = Box<dyn Fn(&S) -> Result<String> + Send + Sync>;
