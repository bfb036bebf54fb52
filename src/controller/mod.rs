//! The controller: a single agent's behavior scheduler.
//!
//! A [`Controller`] owns exactly one active [`ExecutionContext`], a FIFO
//! queue of pending contexts, and one specially-held routine continuation.
//! It mediates interruption, priority arbitration, transition-following,
//! and save/load reconstruction. All mutation of the agent's one
//! active-behavior slot funnels through the public operations here; no
//! external actor may instantiate or destroy a behavior instance directly.
//!
//! # Execution model
//!
//! Single-threaded, cooperative, tick-driven: the scheduler advances only
//! when explicitly driven: once per simulation step via
//! [`Controller::tick`], plus once synchronously inside any
//! enqueue/interrupt call. A pass may chain synchronously through several
//! node resolutions (Restart, jumps, and immediate exits resolve without
//! yielding control); the single-active-instance invariant bounds the
//! chain. Cancellation is purely cooperative: "interrupt" is a request the
//! active behavior may refuse, and the scheduler never force-preempts.
//!
//! # Error model
//!
//! Structural graph errors and behavior configuration failures are logged
//! and resolve toward "abort this context, fall back to queue / routine /
//! idle". Interrupt refusal and insufficient priority are ordinary boolean
//! results. Nothing here panics or retries automatically.
//!
//! # Quick Start
//!
//! ```rust
//! use marionette::behavior::{Behavior, BehaviorError, BehaviorRegistry, BehaviorStatus};
//! use marionette::controller::{Controller, ControllerConfig, RequestOptions};
//! use marionette::graph::{BehaviorNode, GraphBuilder};
//! use serde_json::json;
//!
//! struct Idle;
//!
//! impl Behavior for Idle {
//!     fn configure(&mut self, _: &serde_json::Value) -> Result<(), BehaviorError> {
//!         Ok(())
//!     }
//!     fn poll(&mut self) -> BehaviorStatus {
//!         BehaviorStatus::Running
//!     }
//! }
//!
//! let registry = BehaviorRegistry::new().with("idle", || Box::new(Idle));
//!
//! let mut routine = GraphBuilder::new();
//! let idle = routine.add_behavior(BehaviorNode::new("idle", json!({}), ["done"]));
//! routine.set_entry(idle);
//!
//! let mut controller = Controller::new(routine.build(), registry, ControllerConfig::new());
//! controller.tick();
//! assert!(controller.has_live_instance());
//! ```

mod config;
mod persistence;
mod request;

pub use config::ControllerConfig;
pub use persistence::{
    ControllerSnapshot, PersistedConnection, PersistedContext, PersistedGraph, PersistedNode,
    PersistenceError,
};
pub use request::{GraphSource, RequestOptions};

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::{debug, error, warn};

use crate::behavior::{BehaviorRegistry, BehaviorStatus};
use crate::context::ExecutionContext;
use crate::graph::{Graph, NodeSpec};
use crate::types::{GraphId, NodeId, Port, Priority};

/// A graph owned by the controller, with its lifetime tag.
struct GraphEntry {
    graph: Graph,
    /// Ephemeral graphs are destroyed once no context references them.
    ephemeral: bool,
}

/// Identity of a deferred `interrupt_now` request, held while its context
/// waits at the queue head for the active behavior's consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingInterrupt {
    graph: GraphId,
    priority: Priority,
}

impl PendingInterrupt {
    fn matches(&self, ctx: &ExecutionContext) -> bool {
        ctx.graph == self.graph && ctx.priority == self.priority
    }
}

/// Interruptible, priority-gated scheduler for one agent.
///
/// See the [module docs](self) for the execution and error models.
pub struct Controller {
    graphs: FxHashMap<GraphId, GraphEntry>,
    registry: BehaviorRegistry,
    routine: GraphId,
    active: Option<ExecutionContext>,
    queue: VecDeque<ExecutionContext>,
    saved_routine: Option<ExecutionContext>,
    idle_on_exit: bool,
    /// Set while an `interrupt_now` enqueue waits for the active behavior's
    /// consent; names the interrupting context at the queue head so a
    /// purged or outranked request can be detected and stood down.
    pending_interrupt: Option<PendingInterrupt>,
}

impl Controller {
    /// Creates a controller bound to its routine graph.
    ///
    /// The routine is registered as a persistent graph and started (unless
    /// [`ControllerConfig::idle_on_exit`] is set) on the first pass. Build
    /// the routine with [`GraphBuilder::with_id`](crate::graph::GraphBuilder::with_id)
    /// when snapshots must survive process restarts, so contexts saved
    /// against it re-resolve by id.
    #[must_use]
    pub fn new(routine: Graph, registry: BehaviorRegistry, config: ControllerConfig) -> Self {
        let routine_id = routine.id();
        let mut graphs = FxHashMap::default();
        graphs.insert(
            routine_id,
            GraphEntry {
                graph: routine,
                ephemeral: false,
            },
        );
        Self {
            graphs,
            registry,
            routine: routine_id,
            active: None,
            queue: VecDeque::new(),
            saved_routine: None,
            idle_on_exit: config.idle_on_exit,
            pending_interrupt: None,
        }
    }

    // ========================================================================
    // Request API
    // ========================================================================

    /// Requests execution of a graph, queued or via deferred interruption.
    ///
    /// With `interrupt_now`, the request fails immediately (no state
    /// change) iff an active context exists with priority strictly greater
    /// than the request; otherwise the new context is placed at the queue
    /// head and the scheduler is marked to interrupt on the next pass. The
    /// active behavior's consent is sought on that pass and re-sought each
    /// pass until granted. Without `interrupt_now`, the context is
    /// appended to the queue tail.
    ///
    /// One scheduling pass is always driven synchronously before
    /// returning.
    pub fn enqueue(
        &mut self,
        source: impl Into<GraphSource>,
        interrupt_now: bool,
        options: RequestOptions,
    ) -> bool {
        if interrupt_now
            && let Some(active) = &self.active
            && options.priority < active.priority
        {
            debug!(
                requested = %options.priority,
                active = %active.priority,
                "enqueue rejected: insufficient priority"
            );
            return false;
        }

        let Some(ctx) = self.admit(source.into(), options) else {
            return false;
        };

        if options.clear_queue {
            self.purge_queue();
        }
        if interrupt_now {
            self.pending_interrupt = Some(PendingInterrupt {
                graph: ctx.graph,
                priority: ctx.priority,
            });
            self.queue.push_front(ctx);
        } else {
            self.queue.push_back(ctx);
        }
        self.run_pass();
        true
    }

    /// Immediately attempts to preempt the active context with a new graph.
    ///
    /// On success the new graph becomes active in the same pass. On
    /// failure (active behavior refuses to yield, or priority
    /// insufficient) no state changes and `false` is returned; a
    /// pre-built graph handed in via [`GraphSource`] is simply dropped.
    pub fn try_interrupt(
        &mut self,
        source: impl Into<GraphSource>,
        options: RequestOptions,
    ) -> bool {
        if let Some(active) = &self.active
            && options.priority < active.priority
        {
            debug!(
                requested = %options.priority,
                active = %active.priority,
                "interrupt rejected: insufficient priority"
            );
            return false;
        }

        // Realize and sanity-check the graph before asking the active
        // behavior to yield, so a malformed request leaves no trace.
        let graph = source.into().realize();
        let Some(entry_node) = graph.entry() else {
            error!(graph = %graph.id(), "interrupt rejected: graph has no entry");
            return false;
        };

        if !self.active_consents() {
            debug!("interrupt rejected: active behavior refused to yield");
            return false;
        }

        let graph_id = graph.id();
        self.graphs.entry(graph_id).or_insert(GraphEntry {
            graph,
            ephemeral: options.ephemeral,
        });
        if options.clear_queue {
            self.purge_queue();
        }
        self.yield_active();
        self.active = Some(ExecutionContext::new(
            graph_id,
            entry_node,
            options.savable,
            options.ephemeral,
            options.priority,
        ));
        self.run_pass();
        true
    }

    /// Interrupts the active context (if any) without supplying a
    /// replacement, letting the scheduler fall through to the queue, the
    /// routine, or idle.
    pub fn try_proceed(&mut self, priority: Priority) -> bool {
        if let Some(active) = &self.active {
            if priority < active.priority {
                debug!(
                    requested = %priority,
                    active = %active.priority,
                    "proceed rejected: insufficient priority"
                );
                return false;
            }
            if !self.active_consents() {
                debug!("proceed rejected: active behavior refused to yield");
                return false;
            }
            self.yield_active();
        }
        self.run_pass();
        true
    }

    /// Purges queued contexts referencing `id`; with `include_current`,
    /// also drops a matching active context.
    ///
    /// Removal is owner-driven teardown of a graph (its sponsor went
    /// away), not priority preemption, so the active behavior is dropped
    /// without the voluntary-yield query and without a continuation.
    pub fn remove_by_id(&mut self, id: GraphId, include_current: bool) {
        let mut kept = VecDeque::with_capacity(self.queue.len());
        let mut removed = Vec::new();
        while let Some(ctx) = self.queue.pop_front() {
            if ctx.graph == id {
                removed.push(ctx);
            } else {
                kept.push_back(ctx);
            }
        }
        self.queue = kept;
        for ctx in removed {
            debug!(graph = %id, node = %ctx.node, "removing queued context");
            self.discard_context(ctx);
        }
        if self.pending_interrupt.is_some_and(|pending| pending.graph == id) {
            debug!(graph = %id, "cancelling pending interrupt for removed graph");
            self.pending_interrupt = None;
        }

        if include_current
            && let Some(active) = self.active.take()
        {
            if active.graph == id {
                debug!(graph = %id, node = %active.node, "dropping active context");
                self.discard_context(active);
                self.run_pass();
            } else {
                self.active = Some(active);
            }
        }
    }

    /// Returns `true` if any queued context (or, with `include_current`,
    /// the active context) references `id`.
    #[must_use]
    pub fn has_graph_in_queue(&self, id: GraphId, include_current: bool) -> bool {
        self.queue.iter().any(|ctx| ctx.graph == id)
            || (include_current && self.active.as_ref().is_some_and(|ctx| ctx.graph == id))
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Advances one simulation step: runs a scheduling pass, then polls the
    /// active behavior instance and consumes its exit signal, if raised.
    pub fn tick(&mut self) {
        self.run_pass();
        let outcome = match self
            .active
            .as_mut()
            .and_then(|ctx| ctx.instance.as_mut())
            .map(|instance| instance.poll())
        {
            Some(BehaviorStatus::Exited(outcome)) => outcome,
            Some(BehaviorStatus::Running) | None => return,
        };
        self.handle_exit(&outcome);
    }

    /// Teardown fold for a controller whose hosting entity goes away: the
    /// active context is yielded through the interruption path exactly as
    /// preemption would, so a savable context's continuation lands in the
    /// queue or the saved-routine slot rather than being lost.
    ///
    /// The active behavior is still asked to yield (letting it flush
    /// in-flight work) but refusal cannot veto teardown.
    pub fn shutdown(&mut self) {
        if let Some(instance) = self.active.as_mut().and_then(|ctx| ctx.instance.as_mut()) {
            let _ = instance.interrupt();
        }
        self.yield_active();
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Graph id of the active context, if any.
    #[must_use]
    pub fn active_graph(&self) -> Option<GraphId> {
        self.active.as_ref().map(|ctx| ctx.graph)
    }

    /// Node the active context is at, if any.
    #[must_use]
    pub fn active_node(&self) -> Option<NodeId> {
        self.active.as_ref().map(|ctx| ctx.node)
    }

    /// Priority of the active context, if any.
    #[must_use]
    pub fn active_priority(&self) -> Option<Priority> {
        self.active.as_ref().map(|ctx| ctx.priority)
    }

    /// Number of pending contexts in the FIFO queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if a behavior instance is live right now.
    #[must_use]
    pub fn has_live_instance(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|ctx| ctx.instance.is_some())
    }

    /// Returns `true` if a saved routine continuation is parked.
    #[must_use]
    pub fn has_saved_routine(&self) -> bool {
        self.saved_routine.is_some()
    }

    /// Returns `true` if nothing is active, queued, or parked.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty() && self.saved_routine.is_none()
    }

    /// Looks up an owned graph by id.
    #[must_use]
    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(&id).map(|entry| &entry.graph)
    }

    /// The routine graph's id.
    #[must_use]
    pub fn routine_graph(&self) -> GraphId {
        self.routine
    }

    // ========================================================================
    // Persistence API
    // ========================================================================

    /// Captures the controller's save-eligible state.
    ///
    /// Call [`shutdown`](Self::shutdown) first when the snapshot should
    /// reflect the interruption fold (continuation instead of mid-node
    /// cursor); a plain snapshot records the active context as-is.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            active: self.active.as_ref().map(PersistedContext::from),
            queue: self.queue.iter().map(PersistedContext::from).collect(),
            saved_routine: self.saved_routine.as_ref().map(PersistedContext::from),
            idle_on_exit: self.idle_on_exit,
            graphs: self
                .graphs
                .iter()
                .filter(|(id, _)| **id != self.routine)
                .map(|(_, entry)| PersistedGraph::from_graph(&entry.graph, entry.ephemeral))
                .collect(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Reconstructs controller state from a snapshot.
    ///
    /// A blank load (`blank_load = true`) means "no prior save": the
    /// payload is discarded and the routine graph starts from scratch.
    /// Otherwise graphs are reconstructed by id, each saved context's node
    /// is re-resolved in the (possibly edited) graph, falling back to the
    /// graph's entry with a warning when the node id no longer exists,
    /// and the `load-resume` port is followed from the resolved node to
    /// find the node actually resumed at. A context whose graph cannot be
    /// found at all is dropped with a warning; restore never fails over
    /// content.
    pub fn load_snapshot(
        &mut self,
        snapshot: ControllerSnapshot,
        blank_load: bool,
    ) -> Result<(), PersistenceError> {
        // Discard current runtime state wholesale; live instances drop here.
        self.active = None;
        self.queue.clear();
        self.saved_routine = None;
        self.pending_interrupt = None;
        self.graphs.retain(|id, _| *id == self.routine);

        if blank_load {
            debug!("blank load: starting routine from scratch");
            self.run_pass();
            return Ok(());
        }

        self.idle_on_exit = snapshot.idle_on_exit;
        for persisted in snapshot.graphs {
            if self.graphs.contains_key(&persisted.id) {
                continue;
            }
            let ephemeral = persisted.ephemeral;
            let id = persisted.id;
            let graph = persisted.into_graph()?;
            self.graphs.insert(id, GraphEntry { graph, ephemeral });
        }

        self.saved_routine = snapshot
            .saved_routine
            .and_then(|persisted| self.restore_context(persisted));
        self.queue = snapshot
            .queue
            .into_iter()
            .filter_map(|persisted| self.restore_context(persisted))
            .collect();
        self.active = snapshot
            .active
            .and_then(|persisted| self.restore_context(persisted));

        self.run_pass();
        Ok(())
    }

    /// Resolves one persisted context against the restored graphs.
    fn restore_context(&self, persisted: PersistedContext) -> Option<ExecutionContext> {
        let Some(entry) = self.graphs.get(&persisted.graph) else {
            warn!(graph = %persisted.graph, "saved context references unknown graph; dropping");
            return None;
        };
        let graph = &entry.graph;
        let node = if graph.contains(persisted.node) {
            graph
                .follow(persisted.node, Port::LOAD_RESUME)
                .unwrap_or(persisted.node)
        } else {
            warn!(
                graph = %persisted.graph,
                node = %persisted.node,
                "saved node no longer exists; falling back to entry"
            );
            match graph.entry() {
                Some(entry_node) => entry_node,
                None => {
                    warn!(graph = %persisted.graph, "graph has no entry; dropping saved context");
                    return None;
                }
            }
        };
        Some(ExecutionContext::new(
            persisted.graph,
            node,
            persisted.savable,
            persisted.ephemeral,
            persisted.priority,
        ))
    }

    // ========================================================================
    // Scheduling internals
    // ========================================================================

    /// Realizes a request's graph, registers it, and builds its context.
    fn admit(&mut self, source: GraphSource, options: RequestOptions) -> Option<ExecutionContext> {
        let graph = source.realize();
        let Some(entry_node) = graph.entry() else {
            error!(graph = %graph.id(), "request rejected: graph has no entry");
            return None;
        };
        let graph_id = graph.id();
        self.graphs.entry(graph_id).or_insert(GraphEntry {
            graph,
            ephemeral: options.ephemeral,
        });
        Some(ExecutionContext::new(
            graph_id,
            entry_node,
            options.savable,
            options.ephemeral,
            options.priority,
        ))
    }

    /// Asks the active behavior instance for its voluntary-yield consent.
    /// Vacuously true when nothing is live.
    fn active_consents(&mut self) -> bool {
        match self.active.as_mut().and_then(|ctx| ctx.instance.as_mut()) {
            Some(instance) => instance.interrupt(),
            None => true,
        }
    }

    /// One scheduling pass: honor a pending interrupt, then resolve
    /// transitions until a behavior is live or the controller is idle.
    ///
    /// A pending interrupt is re-validated every pass, not just granted on
    /// consent: the interrupting context must still be at the queue head
    /// (a purge or a later preemption may have removed or displaced it),
    /// and its priority must still pass the gate against whatever context
    /// is active *now*. A request that fails either check stands down to
    /// an ordinary queue entry.
    fn run_pass(&mut self) {
        if let Some(pending) = self.pending_interrupt {
            if !self.queue.front().is_some_and(|ctx| pending.matches(ctx)) {
                // Purged or displaced in the meantime.
                self.pending_interrupt = None;
            } else if self
                .active
                .as_ref()
                .is_some_and(|active| pending.priority < active.priority)
            {
                debug!(
                    requested = %pending.priority,
                    "pending interrupt stood down: outranked by the new active context"
                );
                self.pending_interrupt = None;
            } else if !self.active_consents() {
                debug!("pending interrupt deferred: active behavior refused to yield");
                return;
            } else {
                self.pending_interrupt = None;
                let replacement = self.queue.pop_front();
                self.yield_active();
                self.active = replacement;
            }
        }
        self.resolve_transitions();
    }

    /// Core interruption algorithm. Consent must already be obtained (or
    /// deliberately overridden, as in [`shutdown`](Self::shutdown)).
    ///
    /// Destroys the live instance; a savable context leaves a continuation
    /// at its "interrupted" successor: parked in the saved-routine slot
    /// for the routine graph, pushed to the queue head otherwise. A
    /// continuation with no "interrupted" connection is dropped with a
    /// warning rather than failing the interrupt. The active slot is
    /// cleared on every branch.
    fn yield_active(&mut self) {
        let Some(mut ctx) = self.active.take() else {
            return;
        };
        ctx.clear_instance();

        if ctx.savable {
            let resume = self
                .graphs
                .get(&ctx.graph)
                .and_then(|entry| entry.graph.follow(ctx.node, Port::INTERRUPTED));
            if let Some(node) = resume {
                let continuation = ctx.continuation(node);
                if ctx.graph == self.routine {
                    debug!(node = %node, "parking routine continuation");
                    self.saved_routine = Some(continuation);
                } else {
                    debug!(graph = %ctx.graph, node = %node, "queueing continuation at head");
                    self.queue.push_front(continuation);
                }
                return;
            }
            warn!(
                graph = %ctx.graph,
                node = %ctx.node,
                "no \"interrupted\" connection; dropping continuation"
            );
        }
        self.discard_context(ctx);
    }

    /// Transition-resolution loop; drives every state change.
    fn resolve_transitions(&mut self) {
        loop {
            if self.active.is_none() && !self.pull_next() {
                return; // idle
            }
            let live_elsewhere = self.instance_live_elsewhere();
            let Some(ctx) = self.active.as_mut() else {
                return;
            };
            if ctx.instance.is_some() {
                return; // a behavior is running; wait for its exit signal
            }

            let graph_id = ctx.graph;
            let node_id = ctx.node;
            let Some(entry) = self.graphs.get(&graph_id) else {
                error!(graph = %graph_id, "active context references unknown graph; aborting");
                self.abort_active();
                continue;
            };
            let graph = &entry.graph;

            match graph.node(node_id) {
                None => {
                    error!(graph = %graph_id, node = %node_id, "unknown node id; aborting context");
                    self.abort_active();
                }
                Some(NodeSpec::Exit) => {
                    debug!(graph = %graph_id, "context reached Exit; finalizing");
                    if let Some(finished) = self.active.take() {
                        self.discard_context(finished);
                    }
                }
                Some(NodeSpec::Start) => match graph.follow(node_id, Port::OUT) {
                    Some(next) => ctx.advance(next),
                    None => {
                        error!(graph = %graph_id, "Start has no successor; aborting context");
                        self.abort_active();
                    }
                },
                Some(NodeSpec::Restart) => match graph.entry() {
                    Some(next) => {
                        debug!(graph = %graph_id, node = %next, "Restart: rewinding to entry");
                        ctx.advance(next);
                    }
                    None => {
                        error!(graph = %graph_id, "Restart found no entry; aborting context");
                        self.abort_active();
                    }
                },
                Some(NodeSpec::JumpIn { key }) => {
                    let target = graph
                        .jump_out(key)
                        .and_then(|jump_out| graph.follow(jump_out, Port::OUT));
                    match target {
                        Some(next) => {
                            debug!(graph = %graph_id, key = %key, node = %next, "jump resolved");
                            ctx.advance(next);
                        }
                        None => {
                            // Authoring error; unrecoverable for this context.
                            error!(
                                graph = %graph_id,
                                key = %key,
                                "JumpIn has no matching JumpOut successor; aborting context"
                            );
                            self.abort_active();
                        }
                    }
                }
                Some(NodeSpec::JumpOut { .. }) => match graph.follow(node_id, Port::OUT) {
                    Some(next) => ctx.advance(next),
                    None => {
                        error!(graph = %graph_id, node = %node_id, "JumpOut has no successor; aborting context");
                        self.abort_active();
                    }
                },
                Some(NodeSpec::Behavior(spec)) => {
                    if live_elsewhere {
                        // Scheduler corruption: safe recovery is not possible,
                        // so refuse the activation and surface loudly.
                        error!(
                            graph = %graph_id,
                            node = %node_id,
                            "another behavior instance is already live; refusing activation"
                        );
                        return;
                    }
                    let Some(mut instance) = self.registry.construct(&spec.behavior) else {
                        error!(
                            graph = %graph_id,
                            behavior = %spec.behavior,
                            "behavior type not registered; aborting context"
                        );
                        self.abort_active();
                        continue;
                    };
                    if let Err(err) = instance.configure(&spec.config) {
                        // Drop the half-built instance and abort the context,
                        // so a misconfigured node cannot respawn in a loop.
                        error!(
                            graph = %graph_id,
                            node = %node_id,
                            behavior = %spec.behavior,
                            error = %err,
                            "behavior configuration failed; aborting context"
                        );
                        drop(instance);
                        self.abort_active();
                        continue;
                    }
                    debug!(
                        graph = %graph_id,
                        node = %node_id,
                        behavior = %spec.behavior,
                        priority = %ctx.priority,
                        "behavior activated"
                    );
                    ctx.instance = Some(instance);
                    return;
                }
            }
        }
    }

    /// Exit handling: consume the active instance's outcome and rewrite the
    /// cursor along the matching outcome port.
    fn handle_exit(&mut self, outcome: &str) {
        let Some(ctx) = self.active.as_mut() else {
            return;
        };
        ctx.clear_instance();
        let next = self
            .graphs
            .get(&ctx.graph)
            .and_then(|entry| entry.graph.follow(ctx.node, outcome));
        match next {
            Some(node) => {
                debug!(graph = %ctx.graph, outcome = %outcome, node = %node, "outcome transition");
                ctx.advance(node);
            }
            None => {
                warn!(
                    graph = %ctx.graph,
                    node = %ctx.node,
                    outcome = %outcome,
                    "no transition for outcome; aborting context"
                );
                self.abort_active();
            }
        }
        self.run_pass();
    }

    /// Fills the active slot from the queue, the saved routine, or a fresh
    /// routine context. Returns `false` when the controller goes idle.
    fn pull_next(&mut self) -> bool {
        if let Some(ctx) = self.queue.pop_front() {
            self.active = Some(ctx);
            return true;
        }
        if let Some(ctx) = self.saved_routine.take() {
            debug!(node = %ctx.node, "resuming saved routine continuation");
            self.active = Some(ctx);
            return true;
        }
        if self.idle_on_exit {
            return false;
        }
        let entry_node = self
            .graphs
            .get(&self.routine)
            .and_then(|entry| entry.graph.entry());
        match entry_node {
            Some(node) => {
                debug!(graph = %self.routine, node = %node, "restarting routine from entry");
                self.active = Some(ExecutionContext::new(
                    self.routine,
                    node,
                    true,
                    false,
                    Priority::ROUTINE,
                ));
                true
            }
            None => {
                error!(graph = %self.routine, "routine graph has no entry; controller idle");
                false
            }
        }
    }

    /// Fatal-path invariant check: no context other than the one being
    /// activated may hold a live instance.
    fn instance_live_elsewhere(&self) -> bool {
        self.queue.iter().any(|ctx| ctx.instance.is_some())
            || self
                .saved_routine
                .as_ref()
                .is_some_and(|ctx| ctx.instance.is_some())
    }

    /// Aborts the active context (structural failure path).
    fn abort_active(&mut self) {
        if let Some(ctx) = self.active.take() {
            self.discard_context(ctx);
        }
    }

    /// Destroys a context, releasing its graph if it was the last
    /// reference to an ephemeral one.
    fn discard_context(&mut self, ctx: ExecutionContext) {
        let graph = ctx.graph;
        drop(ctx);
        self.release_graph(graph);
    }

    /// Drops an ephemeral graph once nothing references it. Exactly-once:
    /// the registry entry is the single owner, so a second release finds
    /// nothing to remove.
    fn release_graph(&mut self, id: GraphId) {
        let ephemeral = self.graphs.get(&id).is_some_and(|entry| entry.ephemeral);
        if !ephemeral || self.referenced(id) {
            return;
        }
        debug!(graph = %id, "destroying ephemeral graph");
        self.graphs.remove(&id);
    }

    /// Returns `true` while any context still references `id`.
    fn referenced(&self, id: GraphId) -> bool {
        self.active.as_ref().is_some_and(|ctx| ctx.graph == id)
            || self.queue.iter().any(|ctx| ctx.graph == id)
            || self.saved_routine.as_ref().is_some_and(|ctx| ctx.graph == id)
    }

    /// Discards every queued context (clear-queue admission option).
    fn purge_queue(&mut self) {
        self.pending_interrupt = None;
        while let Some(ctx) = self.queue.pop_front() {
            self.discard_context(ctx);
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("routine", &self.routine)
            .field("active", &self.active)
            .field("queue_len", &self.queue.len())
            .field("saved_routine", &self.saved_routine.is_some())
            .field("idle_on_exit", &self.idle_on_exit)
            .field("graphs", &self.graphs.len())
            .finish()
    }
}
