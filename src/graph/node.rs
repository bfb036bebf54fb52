//! Node kinds for behavior graphs.
//!
//! Nodes form a closed variant set ([`NodeSpec`]): routing nodes (Start,
//! Exit, Restart, the JumpIn/JumpOut pair) carry no payload, while
//! [`BehaviorNode`] names a concrete behavior type, its configuration, and
//! its outcome enumeration. There is no open extension point here: new
//! node kinds are new enum variants, resolved with static dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::Port;

/// A single node in a behavior graph.
///
/// Routing nodes resolve synchronously inside one scheduling pass; only a
/// `Behavior` node yields control to a live behavior instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeSpec {
    /// Single entry point; one outgoing [`Port::OUT`].
    Start,
    /// Terminal; reaching it finalizes the owning execution context.
    Exit,
    /// Redirects execution back to the node after Start.
    Restart,
    /// Symbolic goto source: rewrites execution to the matching
    /// [`NodeSpec::JumpOut`]'s successor. Exactly one JumpOut must exist
    /// per key used by a JumpIn, else the graph is malformed.
    JumpIn { key: String },
    /// Symbolic goto target; one outgoing [`Port::OUT`].
    JumpOut { key: String },
    /// Instantiates a concrete behavior when reached.
    Behavior(BehaviorNode),
}

/// Payload of a behavior node.
///
/// `behavior` is a [`BehaviorRegistry`](crate::behavior::BehaviorRegistry)
/// key, not a type reference, which keeps the graph structure flat and
/// serializable. Outgoing ports are the declared `outcomes` plus the fixed
/// [`Port::INTERRUPTED`] and [`Port::LOAD_RESUME`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNode {
    /// Registry key of the concrete behavior type.
    pub behavior: String,
    /// Configuration payload handed to [`Behavior::configure`](crate::behavior::Behavior::configure).
    pub config: Value,
    /// Names of this behavior's outcome ports.
    pub outcomes: Vec<String>,
}

impl BehaviorNode {
    /// Creates a behavior node payload.
    #[must_use]
    pub fn new(
        behavior: impl Into<String>,
        config: Value,
        outcomes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            behavior: behavior.into(),
            config,
            outcomes: outcomes.into_iter().map(Into::into).collect(),
        }
    }
}

impl NodeSpec {
    /// Outgoing port names this node may legally connect from.
    #[must_use]
    pub fn out_ports(&self) -> Vec<&str> {
        match self {
            NodeSpec::Start | NodeSpec::JumpOut { .. } => vec![Port::OUT],
            NodeSpec::Exit | NodeSpec::Restart | NodeSpec::JumpIn { .. } => Vec::new(),
            NodeSpec::Behavior(spec) => {
                let mut ports: Vec<&str> = spec.outcomes.iter().map(String::as_str).collect();
                ports.push(Port::INTERRUPTED);
                ports.push(Port::LOAD_RESUME);
                ports
            }
        }
    }

    /// Returns `true` if this node carries a behavior payload.
    #[must_use]
    pub fn is_behavior(&self) -> bool {
        matches!(self, Self::Behavior(_))
    }

    /// Returns `true` if this node is a terminal Exit.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit)
    }
}

impl fmt::Display for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::Exit => write!(f, "Exit"),
            Self::Restart => write!(f, "Restart"),
            Self::JumpIn { key } => write!(f, "JumpIn({key})"),
            Self::JumpOut { key } => write!(f, "JumpOut({key})"),
            Self::Behavior(spec) => write!(f, "Behavior({})", spec.behavior),
        }
    }
}
