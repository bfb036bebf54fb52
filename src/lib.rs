//! # Marionette: Interruptible Behavior Graph Engine
//!
//! Marionette drives one agent's moment-to-moment behavior by executing
//! graphs of typed nodes under a priority-gated, interruptible scheduler
//! with deterministic save/restore.
//!
//! ## Core Concepts
//!
//! - **Graphs**: Id-addressed arenas of typed nodes connected through
//!   named ports; looping, nested, and jump-capable
//! - **Behaviors**: Pluggable units of work driven one tick at a time,
//!   exiting with one value from their outcome enumeration
//! - **Execution contexts**: Resumable cursors (graph + node + flags +
//!   priority + live instance), the unit of queuing and of save/restore
//! - **Controller**: One active context, a FIFO queue, and a routine
//!   fallback; mediates interruption and priority arbitration
//!
//! ## Quick Start
//!
//! ### Defining a Behavior
//!
//! ```
//! use marionette::behavior::{Behavior, BehaviorError, BehaviorStatus};
//! use serde_json::Value;
//!
//! struct Patrol {
//!     waypoints: u32,
//! }
//!
//! impl Patrol {
//!     pub const DONE: &'static str = "done";
//! }
//!
//! impl Behavior for Patrol {
//!     fn configure(&mut self, config: &Value) -> Result<(), BehaviorError> {
//!         self.waypoints = config
//!             .get("waypoints")
//!             .and_then(Value::as_u64)
//!             .ok_or(BehaviorError::MissingConfig { what: "waypoints" })? as u32;
//!         Ok(())
//!     }
//!
//!     fn poll(&mut self) -> BehaviorStatus {
//!         if self.waypoints == 0 {
//!             BehaviorStatus::exited(Self::DONE)
//!         } else {
//!             self.waypoints -= 1;
//!             BehaviorStatus::Running
//!         }
//!     }
//!
//!     fn interrupt(&mut self) -> bool {
//!         true // fine to drop a patrol mid-route
//!     }
//! }
//! ```
//!
//! ### Building and Running a Graph
//!
//! ```
//! # use marionette::behavior::{Behavior, BehaviorError, BehaviorStatus};
//! # struct Patrol { waypoints: u32 }
//! # impl Behavior for Patrol {
//! #     fn configure(&mut self, c: &serde_json::Value) -> Result<(), BehaviorError> {
//! #         self.waypoints = c.get("waypoints").and_then(serde_json::Value::as_u64).unwrap_or(0) as u32;
//! #         Ok(())
//! #     }
//! #     fn poll(&mut self) -> BehaviorStatus {
//! #         if self.waypoints == 0 { BehaviorStatus::exited("done") } else { self.waypoints -= 1; BehaviorStatus::Running }
//! #     }
//! # }
//! use marionette::behavior::BehaviorRegistry;
//! use marionette::controller::{Controller, ControllerConfig};
//! use marionette::graph::{BehaviorNode, GraphBuilder};
//! use serde_json::json;
//!
//! let registry =
//!     BehaviorRegistry::new().with("patrol", || Box::new(Patrol { waypoints: 0 }));
//!
//! // Routine: patrol two waypoints, then restart.
//! let mut routine = GraphBuilder::new();
//! let patrol = routine.add_behavior(BehaviorNode::new(
//!     "patrol",
//!     json!({"waypoints": 2}),
//!     ["done"],
//! ));
//! let restart = routine.add_restart();
//! routine.set_entry(patrol);
//! routine.connect(patrol, "done", restart);
//!
//! let mut controller = Controller::new(routine.build(), registry, ControllerConfig::new());
//!
//! // Drive once per simulation step.
//! for _ in 0..5 {
//!     controller.tick();
//! }
//! assert!(controller.has_live_instance());
//! ```
//!
//! ### Preemption and Continuations
//!
//! Requests carry a [`Priority`](types::Priority); a request strictly below
//! the active context's priority never mutates state. A savable context
//! that accepts an interruption leaves a continuation at its
//! `"interrupted"` port successor, resumed once higher-priority work
//! drains.
//!
//! ### Save / Restore
//!
//! [`Controller::snapshot`](controller::Controller::snapshot) captures the
//! active/queued/saved cursors and the structure of every runtime-owned
//! graph; [`Controller::load_snapshot`](controller::Controller::load_snapshot)
//! rebuilds them, re-entering behaviors through their `"load-resume"`
//! ports. Serialization crosses the host boundary as JSON via
//! [`utils::json_ext::JsonSerializable`].
//!
//! ## Module Guide
//!
//! - [`types`] - Graph/node ids, priorities, well-known port names
//! - [`graph`] - Graph model, node kinds, and the builder
//! - [`behavior`] - The behavior protocol and type registry
//! - [`context`] - Execution contexts (resumable cursors)
//! - [`controller`] - The scheduler and its persistence models
//! - [`telemetry`] - Default tracing subscriber setup

pub mod behavior;
pub mod context;
pub mod controller;
pub mod graph;
pub mod telemetry;
pub mod types;
pub mod utils;
