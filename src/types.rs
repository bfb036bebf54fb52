//! Core identifier types for the marionette engine.
//!
//! This module defines the fundamental types used throughout the engine for
//! addressing graphs, nodes, and scheduling priorities. These are the core
//! domain concepts that every other module builds on.
//!
//! # Key Types
//!
//! - [`GraphId`]: Stable identity of a behavior graph
//! - [`NodeId`]: Stable key of a node inside a graph's arena
//! - [`Priority`]: Integer scheduling priority (higher wins)
//! - [`Port`]: Well-known port names shared by every node kind
//!
//! # Examples
//!
//! ```rust
//! use marionette::types::{GraphId, NodeId, Port, Priority};
//!
//! let graph = GraphId::new();
//! let node = NodeId(0);
//!
//! // Priorities compare numerically; the routine sits at the floor.
//! assert!(Priority(5) > Priority(2));
//! assert!(Priority(0) > Priority::ROUTINE);
//!
//! // Fixed ports are plain string names.
//! assert_eq!(Port::INTERRUPTED, "interrupted");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a behavior graph.
///
/// Graphs are addressed by id everywhere in the engine: execution contexts
/// reference their graph by `GraphId` rather than by pointer, which keeps
/// the queue, the saved-routine slot, and snapshots free of ownership
/// cycles. Ids survive save/load round-trips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a fresh random graph id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable key of a node within a graph's arena.
///
/// Assigned sequentially by the [`GraphBuilder`](crate::graph::GraphBuilder)
/// and never reused, so a `NodeId` recorded in a snapshot can be resolved
/// against a later (possibly edited) revision of the same graph; resolution
/// failure is an explicit "not found", never a dangling reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Scheduling priority of an execution request. Higher values win.
///
/// The priority gate rejects a request iff its priority is *strictly less*
/// than the active context's priority; an equal-priority request may
/// preempt.
///
/// # Examples
///
/// ```rust
/// use marionette::types::Priority;
///
/// let active = Priority(5);
/// assert!(Priority(2) < active);    // rejected
/// assert!(!(Priority(5) < active)); // allowed to preempt
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    /// The floor priority reserved for the routine graph, so any request
    /// can preempt it.
    pub const ROUTINE: Priority = Priority(i32::MIN);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ROUTINE {
            write!(f, "routine")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Well-known port names.
///
/// Outgoing ports are identified by plain strings: behavior nodes expose one
/// port per outcome value plus the two fixed ports below; Start and JumpOut
/// nodes expose a single [`Port::OUT`].
pub struct Port;

impl Port {
    /// The single outgoing port of Start and JumpOut nodes.
    pub const OUT: &'static str = "out";
    /// Followed when a savable context is preempted, to find the node its
    /// continuation resumes at.
    pub const INTERRUPTED: &'static str = "interrupted";
    /// Followed on snapshot restore, so a behavior can skip one-shot setup.
    pub const LOAD_RESUME: &'static str = "load-resume";
}
