//! Execution contexts: resumable cursors into behavior graphs.
//!
//! An [`ExecutionContext`] is the unit of queuing and of save/restore: a
//! graph reference, the node to execute, scheduling flags, a priority, and
//! (only while actively running) the live behavior instance. It is a pure
//! data holder; every invariant-bearing mutation is performed on it by the
//! controller.

use crate::behavior::Behavior;
use crate::types::{GraphId, NodeId, Priority};

/// A resumable cursor into a behavior graph.
///
/// The `instance` slot is the system-wide single-active-behavior invariant
/// made explicit: it is non-`None` only while a behavior is actively
/// running for this context, and at most one context per controller holds
/// an instance at any observation point (the active one).
pub struct ExecutionContext {
    /// Graph this context executes, by id.
    pub graph: GraphId,
    /// Node to execute next (or currently executing).
    pub node: NodeId,
    /// Whether interruption preserves a continuation instead of discarding
    /// this context.
    pub savable: bool,
    /// Whether the graph was runtime-constructed and should be destroyed
    /// once no context references it.
    pub ephemeral: bool,
    /// Scheduling priority; higher wins.
    pub priority: Priority,
    /// Live behavior instance, present only while running.
    pub instance: Option<Box<dyn Behavior>>,
}

impl ExecutionContext {
    /// Creates a context poised at `node` with no live instance.
    #[must_use]
    pub fn new(
        graph: GraphId,
        node: NodeId,
        savable: bool,
        ephemeral: bool,
        priority: Priority,
    ) -> Self {
        Self {
            graph,
            node,
            savable,
            ephemeral,
            priority,
            instance: None,
        }
    }

    /// Advances the cursor to `node` (on transition).
    pub fn advance(&mut self, node: NodeId) {
        self.node = node;
    }

    /// Drops the live instance, if any (on cleanup).
    pub fn clear_instance(&mut self) {
        self.instance = None;
    }

    /// Builds the continuation left behind when this context is preempted.
    ///
    /// Flags and priority are copied forward unchanged; the instance is
    /// never carried over.
    #[must_use]
    pub fn continuation(&self, node: NodeId) -> Self {
        Self::new(self.graph, node, self.savable, self.ephemeral, self.priority)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("graph", &self.graph)
            .field("node", &self.node)
            .field("savable", &self.savable)
            .field("ephemeral", &self.ephemeral)
            .field("priority", &self.priority)
            .field("live", &self.instance.is_some())
            .finish()
    }
}
