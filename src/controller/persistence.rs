/*!
Persistence primitives for serializing/deserializing controller state.

Design Goals:
- Provide explicit serde-friendly structs decoupled from the in-memory
  representations (`ExecutionContext`, `Graph`).
- Keep conversion logic localized (From / from_graph impls) so the
  snapshot code on the controller is lean and declarative.
- Never serialize live behavior instances: a snapshot captures graph
  structure and cursor positions only; behaviors are reconstructed through
  the registry on restore.

This module intentionally does NOT perform I/O. It is pure data
transformation and (de)serialization glue; the JSON boundary lives in
[`crate::utils::json_ext`].
*/

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::context::ExecutionContext;
use crate::graph::{BehaviorNode, Graph, NodeSpec};
use crate::types::{GraphId, NodeId, Priority};
use crate::utils::json_ext::JsonSerializable;

/// Persisted shape of one execution context's save-eligible fields.
///
/// The live instance is deliberately absent: restore re-enters the node
/// through the `load-resume` port instead of rehydrating behavior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedContext {
    pub graph: GraphId,
    pub node: NodeId,
    pub savable: bool,
    pub ephemeral: bool,
    pub priority: Priority,
}

impl From<&ExecutionContext> for PersistedContext {
    fn from(ctx: &ExecutionContext) -> Self {
        Self {
            graph: ctx.graph,
            node: ctx.node,
            savable: ctx.savable,
            ephemeral: ctx.ephemeral,
            priority: ctx.priority,
        }
    }
}

/// Persisted shape of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: NodeId,
    /// Node kind discriminator: `"start"`, `"exit"`, `"restart"`,
    /// `"jump-in"`, `"jump-out"`, `"behavior"`.
    pub kind: String,
    /// Jump key for jump nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Registry key for behavior nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<String>,
}

impl PersistedNode {
    fn from_spec(id: NodeId, spec: &NodeSpec) -> Self {
        let mut node = Self {
            id,
            kind: String::new(),
            key: None,
            behavior: None,
            config: None,
            outcomes: Vec::new(),
        };
        match spec {
            NodeSpec::Start => node.kind = "start".into(),
            NodeSpec::Exit => node.kind = "exit".into(),
            NodeSpec::Restart => node.kind = "restart".into(),
            NodeSpec::JumpIn { key } => {
                node.kind = "jump-in".into();
                node.key = Some(key.clone());
            }
            NodeSpec::JumpOut { key } => {
                node.kind = "jump-out".into();
                node.key = Some(key.clone());
            }
            NodeSpec::Behavior(spec) => {
                node.kind = "behavior".into();
                node.behavior = Some(spec.behavior.clone());
                node.config = Some(spec.config.clone());
                node.outcomes = spec.outcomes.clone();
            }
        }
        node
    }

    fn into_spec(self) -> Result<NodeSpec> {
        match self.kind.as_str() {
            "start" => Ok(NodeSpec::Start),
            "exit" => Ok(NodeSpec::Exit),
            "restart" => Ok(NodeSpec::Restart),
            "jump-in" => Ok(NodeSpec::JumpIn {
                key: self.key.ok_or(PersistenceError::MissingField("key"))?,
            }),
            "jump-out" => Ok(NodeSpec::JumpOut {
                key: self.key.ok_or(PersistenceError::MissingField("key"))?,
            }),
            "behavior" => Ok(NodeSpec::Behavior(BehaviorNode {
                behavior: self
                    .behavior
                    .ok_or(PersistenceError::MissingField("behavior"))?,
                config: self.config.unwrap_or(Value::Null),
                outcomes: self.outcomes,
            })),
            other => Err(PersistenceError::UnknownNodeKind(other.to_owned())),
        }
    }
}

/// Persisted shape of one port-to-port connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConnection {
    pub from: NodeId,
    pub port: String,
    pub to: NodeId,
}

/// Flat serializable representation of a graph's structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub id: GraphId,
    pub ephemeral: bool,
    pub start: NodeId,
    pub nodes: Vec<PersistedNode>,
    pub connections: Vec<PersistedConnection>,
}

impl PersistedGraph {
    /// Flattens a graph's structure (not its live instances).
    #[must_use]
    pub fn from_graph(graph: &Graph, ephemeral: bool) -> Self {
        let mut nodes: Vec<PersistedNode> = graph
            .nodes()
            .map(|(id, spec)| PersistedNode::from_spec(id, spec))
            .collect();
        nodes.sort_by_key(|n| n.id);
        let mut connections: Vec<PersistedConnection> = graph
            .connections()
            .map(|(from, port, to)| PersistedConnection {
                from,
                port: port.to_owned(),
                to,
            })
            .collect();
        connections.sort_by(|a, b| (a.from, &a.port).cmp(&(b.from, &b.port)));
        Self {
            id: graph.id(),
            ephemeral,
            start: graph.start_node(),
            nodes,
            connections,
        }
    }

    /// Reassembles the in-memory graph.
    pub fn into_graph(self) -> Result<Graph> {
        let mut nodes = FxHashMap::default();
        for node in self.nodes {
            let id = node.id;
            nodes.insert(id, node.into_spec()?);
        }
        let connections = self
            .connections
            .into_iter()
            .map(|c| ((c.from, c.port), c.to))
            .collect();
        Ok(Graph::from_parts(self.id, nodes, connections, self.start))
    }
}

/// Full persisted controller state.
///
/// Captures the active context's save-eligible fields (or none), the
/// ordered pending queue, the saved-routine continuation, the idle policy,
/// and the structure of every non-routine graph the controller owns. The
/// routine graph is authored, not serialized; it is expected to be
/// registered (under a stable id) before the snapshot is loaded back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<PersistedContext>,
    #[serde(default)]
    pub queue: Vec<PersistedContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_routine: Option<PersistedContext>,
    pub idle_on_exit: bool,
    #[serde(default)]
    pub graphs: Vec<PersistedGraph>,
    /// RFC3339 string form of creation time (keeps chrono::DateTime out of
    /// the serialized shape).
    pub created_at: String,
}

/// Bidirectional conversion and serialization errors for persistence
/// models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("missing field: {0}")]
    #[diagnostic(
        code(marionette::persistence::missing_field),
        help("Populate the field in the persisted JSON before conversion.")
    )]
    MissingField(&'static str),

    #[error("unknown node kind: {0}")]
    #[diagnostic(
        code(marionette::persistence::unknown_node_kind),
        help("Snapshot was written by an incompatible engine version.")
    )]
    UnknownNodeKind(String),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(marionette::persistence::serde),
        help("Ensure the JSON structure matches the Persisted* types.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Blanket implementation of JsonSerializable for all suitable types using
/// PersistenceError.
impl<T> JsonSerializable<PersistenceError> for T
where
    T: serde::Serialize + for<'de> serde::de::DeserializeOwned,
{
    fn to_json_string(&self) -> std::result::Result<String, PersistenceError> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Serde { source: e })
    }

    fn from_json_str(s: &str) -> std::result::Result<Self, PersistenceError> {
        serde_json::from_str(s).map_err(|e| PersistenceError::Serde { source: e })
    }
}
