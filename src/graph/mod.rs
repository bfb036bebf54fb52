//! Behavior graph model: an id-addressed arena of typed nodes connected
//! through named ports.
//!
//! A [`Graph`] is effectively an adjacency table over stable ids: nodes live
//! in an arena keyed by [`NodeId`], and every connection is resolved by a
//! `(node id, port name)` lookup rather than by pointer, so cyclic and
//! self-looping graphs carry no ownership cycles. Graphs are immutable
//! during execution; [`Graph::connect`] is an authoring-time edit.
//!
//! Every lookup either succeeds or returns an explicit `None`; the graph
//! itself never errors. Malformed structure (a JumpIn without its JumpOut,
//! a missing entry) is surfaced by [`Graph::validate`] for tooling and
//! handled as a controller-level abort at execution time.
//!
//! # Quick Start
//!
//! ```rust
//! use marionette::graph::{BehaviorNode, GraphBuilder};
//! use serde_json::json;
//!
//! let mut builder = GraphBuilder::new();
//! let patrol = builder.add_behavior(BehaviorNode::new("patrol", json!({}), ["done"]));
//! let exit = builder.exit();
//! builder.set_entry(patrol);
//! builder.connect(patrol, "done", exit);
//! let graph = builder.build();
//!
//! assert_eq!(graph.entry(), Some(patrol));
//! assert_eq!(graph.follow(patrol, "done"), Some(exit));
//! assert!(graph.validate().is_empty());
//! ```

mod builder;
mod node;

pub use builder::GraphBuilder;
pub use node::{BehaviorNode, NodeSpec};

use rustc_hash::FxHashMap;

use crate::types::{GraphId, NodeId, Port};

/// An addressable, directed graph of typed nodes.
///
/// Owned by the controller's graph registry and referenced from execution
/// contexts by [`GraphId`]; see the [module docs](self) for the lookup
/// contract.
#[derive(Clone, Debug)]
pub struct Graph {
    id: GraphId,
    nodes: FxHashMap<NodeId, NodeSpec>,
    connections: FxHashMap<(NodeId, String), NodeId>,
    start: NodeId,
}

impl Graph {
    /// Reassembles a graph from raw parts (used by the builder and by
    /// snapshot restore).
    #[must_use]
    pub fn from_parts(
        id: GraphId,
        nodes: FxHashMap<NodeId, NodeSpec>,
        connections: FxHashMap<(NodeId, String), NodeId>,
        start: NodeId,
    ) -> Self {
        Self {
            id,
            nodes,
            connections,
            start,
        }
    }

    /// Stable identity of this graph.
    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The Start node's id.
    #[must_use]
    pub fn start_node(&self) -> NodeId {
        self.start
    }

    /// The node execution begins at: Start's successor along [`Port::OUT`].
    ///
    /// `None` means the graph is malformed (no entry was authored).
    #[must_use]
    pub fn entry(&self) -> Option<NodeId> {
        self.follow(self.start, Port::OUT)
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.get(&id)
    }

    /// Returns `true` if `id` resolves to a node in this graph.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The node reached by following `port` out of `from`, if connected.
    #[must_use]
    pub fn follow(&self, from: NodeId, port: &str) -> Option<NodeId> {
        self.connections.get(&(from, port.to_owned())).copied()
    }

    /// Connects an outgoing port to a target node.
    ///
    /// Each transition-out port connects to at most one node; reconnecting
    /// an already-wired port replaces the earlier target (logged, since
    /// that usually indicates an authoring slip).
    pub fn connect(&mut self, from: NodeId, port: impl Into<String>, to: NodeId) {
        let port = port.into();
        if let Some(previous) = self
            .connections
            .insert((from, port.clone()), to)
        {
            tracing::warn!(
                graph = %self.id,
                node = %from,
                port = %port,
                %previous,
                replacement = %to,
                "reconnecting an already-wired port"
            );
        }
    }

    /// Finds the JumpOut node matching `key`.
    #[must_use]
    pub fn jump_out(&self, key: &str) -> Option<NodeId> {
        self.nodes.iter().find_map(|(id, spec)| match spec {
            NodeSpec::JumpOut { key: k } if k == key => Some(*id),
            _ => None,
        })
    }

    /// Iterates over all nodes with their ids.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeSpec)> {
        self.nodes.iter().map(|(id, spec)| (*id, spec))
    }

    /// Iterates over all connections as `(from, port, to)` triples.
    pub fn connections(&self) -> impl Iterator<Item = (NodeId, &str, NodeId)> {
        self.connections
            .iter()
            .map(|((from, port), to)| (*from, port.as_str(), *to))
    }

    /// Checks the structure for authoring errors.
    ///
    /// Execution-time lookups never fail; this is the tooling-facing view
    /// of everything the controller would otherwise abort a context over.
    #[must_use]
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        if self.entry().is_none() {
            issues.push(GraphIssue::MissingEntry);
        }

        for (id, spec) in self.nodes() {
            if let NodeSpec::JumpIn { key } = spec {
                match self.nodes().filter(|(_, s)| matches!(s, NodeSpec::JumpOut { key: k } if k == key)).count() {
                    1 => {}
                    0 => issues.push(GraphIssue::UnpairedJump {
                        node: id,
                        key: key.clone(),
                    }),
                    n => issues.push(GraphIssue::AmbiguousJump {
                        key: key.clone(),
                        count: n,
                    }),
                }
            }
        }

        for (from, port, to) in self.connections() {
            if !self.contains(to) {
                issues.push(GraphIssue::DanglingConnection {
                    from,
                    port: port.to_owned(),
                    to,
                });
            }
            match self.node(from) {
                Some(spec) if !spec.out_ports().contains(&port) => {
                    issues.push(GraphIssue::UnknownPort {
                        node: from,
                        port: port.to_owned(),
                    });
                }
                Some(_) => {}
                None => issues.push(GraphIssue::DanglingConnection {
                    from,
                    port: port.to_owned(),
                    to,
                }),
            }
        }

        issues
    }
}

/// An authoring error found by [`Graph::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphIssue {
    /// Start has no successor along [`Port::OUT`].
    MissingEntry,
    /// A JumpIn key with no matching JumpOut.
    UnpairedJump { node: NodeId, key: String },
    /// More than one JumpOut shares a key.
    AmbiguousJump { key: String, count: usize },
    /// A connection references a node id not present in the arena.
    DanglingConnection {
        from: NodeId,
        port: String,
        to: NodeId,
    },
    /// A connection leaves a port the source node does not expose.
    UnknownPort { node: NodeId, port: String },
}
