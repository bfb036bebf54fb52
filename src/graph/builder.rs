//! Fluent construction of behavior graphs.
//!
//! [`GraphBuilder`] owns the arena while a graph is being authored: it
//! assigns stable [`NodeId`]s, wires ports, and hands out a finished
//! [`Graph`] from [`build`](GraphBuilder::build). Start and Exit endpoints
//! are created implicitly: every graph gets exactly one Start and a
//! default Exit terminal up front, additional terminals via
//! [`add_exit`](GraphBuilder::add_exit).

use rustc_hash::FxHashMap;

use crate::graph::{BehaviorNode, Graph, NodeSpec};
use crate::types::{GraphId, NodeId, Port};

/// Builder for behavior graphs.
///
/// # Examples
///
/// A patrol loop with a shared "flee" subgraph reachable through a jump
/// pair:
///
/// ```rust
/// use marionette::graph::{BehaviorNode, GraphBuilder};
/// use serde_json::json;
///
/// let mut builder = GraphBuilder::new();
/// let patrol = builder.add_behavior(BehaviorNode::new("patrol", json!({}), ["spotted"]));
/// let jump = builder.add_jump_in("flee");
/// let flee_entry = builder.add_jump_out("flee");
/// let flee = builder.add_behavior(BehaviorNode::new("flee", json!({}), ["safe"]));
/// let restart = builder.add_restart();
///
/// builder.set_entry(patrol);
/// builder.connect(patrol, "spotted", jump);
/// builder.connect(flee_entry, marionette::types::Port::OUT, flee);
/// builder.connect(flee, "safe", restart);
///
/// let graph = builder.build();
/// assert!(graph.validate().is_empty());
/// ```
pub struct GraphBuilder {
    id: GraphId,
    nodes: FxHashMap<NodeId, NodeSpec>,
    connections: FxHashMap<(NodeId, String), NodeId>,
    start: NodeId,
    exit: NodeId,
    next: u32,
}

impl GraphBuilder {
    /// Creates a builder with a fresh random [`GraphId`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(GraphId::new())
    }

    /// Creates a builder for a graph with a known id (used when an
    /// authored graph must keep its identity across sessions).
    #[must_use]
    pub fn with_id(id: GraphId) -> Self {
        let mut nodes = FxHashMap::default();
        let start = NodeId(0);
        let exit = NodeId(1);
        nodes.insert(start, NodeSpec::Start);
        nodes.insert(exit, NodeSpec::Exit);
        Self {
            id,
            nodes,
            connections: FxHashMap::default(),
            start,
            exit,
            next: 2,
        }
    }

    /// The graph's id.
    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The implicit Start node.
    #[must_use]
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// The default Exit terminal.
    #[must_use]
    pub fn exit(&self) -> NodeId {
        self.exit
    }

    fn insert(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, spec);
        id
    }

    /// Adds a behavior node.
    pub fn add_behavior(&mut self, node: BehaviorNode) -> NodeId {
        self.insert(NodeSpec::Behavior(node))
    }

    /// Adds a Restart redirector.
    pub fn add_restart(&mut self) -> NodeId {
        self.insert(NodeSpec::Restart)
    }

    /// Adds a JumpIn node for `key`.
    pub fn add_jump_in(&mut self, key: impl Into<String>) -> NodeId {
        self.insert(NodeSpec::JumpIn { key: key.into() })
    }

    /// Adds a JumpOut node for `key`.
    pub fn add_jump_out(&mut self, key: impl Into<String>) -> NodeId {
        self.insert(NodeSpec::JumpOut { key: key.into() })
    }

    /// Adds an additional Exit terminal.
    pub fn add_exit(&mut self) -> NodeId {
        self.insert(NodeSpec::Exit)
    }

    /// Wires Start's [`Port::OUT`] to `to`, making it the graph's entry.
    pub fn set_entry(&mut self, to: NodeId) {
        self.connect(self.start, Port::OUT, to);
    }

    /// Connects an outgoing port to a target node.
    pub fn connect(&mut self, from: NodeId, port: impl Into<String>, to: NodeId) {
        self.connections.insert((from, port.into()), to);
    }

    /// Finishes the graph.
    ///
    /// Authoring errors do not fail the build; they surface through
    /// [`Graph::validate`] and are logged here so a malformed graph is
    /// visible the moment it is authored rather than when the controller
    /// aborts a context over it.
    #[must_use]
    pub fn build(self) -> Graph {
        let graph = Graph::from_parts(self.id, self.nodes, self.connections, self.start);
        for issue in graph.validate() {
            tracing::warn!(graph = %graph.id(), ?issue, "graph built with authoring issue");
        }
        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
