//! Request types for the controller's public API.
//!
//! External callers (perception, sound reaction, scripted events) hand the
//! controller either a pre-built graph or a factory, plus the scheduling
//! options of the request. A failed request never registers the graph, so
//! a pre-built ephemeral graph passed by value is simply dropped; Drop is
//! its disposal.

use crate::graph::Graph;
use crate::types::Priority;

/// A graph, or a recipe for one.
///
/// Factories are only invoked once the request has passed the priority
/// gate (and, for [`Controller::try_interrupt`](crate::controller::Controller::try_interrupt),
/// before the voluntary-yield query), so a rejected request constructs
/// nothing.
pub enum GraphSource {
    /// A graph built ahead of time.
    Graph(Graph),
    /// A constructor invoked at admission time.
    Factory(Box<dyn FnOnce() -> Graph>),
}

impl GraphSource {
    /// Produces the concrete graph.
    #[must_use]
    pub fn realize(self) -> Graph {
        match self {
            GraphSource::Graph(graph) => graph,
            GraphSource::Factory(factory) => factory(),
        }
    }

    /// Wraps a factory closure.
    #[must_use]
    pub fn factory<F>(factory: F) -> Self
    where
        F: FnOnce() -> Graph + 'static,
    {
        GraphSource::Factory(Box::new(factory))
    }
}

impl From<Graph> for GraphSource {
    fn from(graph: Graph) -> Self {
        GraphSource::Graph(graph)
    }
}

impl std::fmt::Debug for GraphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphSource::Graph(graph) => f.debug_tuple("Graph").field(&graph.id()).finish(),
            GraphSource::Factory(_) => f.debug_tuple("Factory").finish(),
        }
    }
}

/// Scheduling options of an execution request.
///
/// # Examples
///
/// ```rust
/// use marionette::controller::RequestOptions;
/// use marionette::types::Priority;
///
/// let options = RequestOptions::new()
///     .savable(true)
///     .ephemeral(true)
///     .priority(Priority(5));
/// assert!(options.savable);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestOptions {
    /// Preserve a continuation when this context is later preempted.
    pub savable: bool,
    /// Purge the pending queue before admitting this request.
    pub clear_queue: bool,
    /// The graph is runtime-constructed; destroy it once unreferenced.
    pub ephemeral: bool,
    /// Scheduling priority; higher wins.
    pub priority: Priority,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn savable(mut self, savable: bool) -> Self {
        self.savable = savable;
        self
    }

    #[must_use]
    pub fn clear_queue(mut self, clear_queue: bool) -> Self {
        self.clear_queue = clear_queue;
        self
    }

    #[must_use]
    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
