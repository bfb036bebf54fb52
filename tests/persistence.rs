//! Save/load round-trips against live controllers: snapshot shape, blank
//! loads, edited-graph fallback, and the load-resume port.

mod common;

use common::behaviors::{Probe, probe_registry};
use common::fixtures::{routine_graph_with_id, task_graph};
use marionette::controller::{Controller, ControllerConfig, RequestOptions};
use marionette::graph::{BehaviorNode, GraphBuilder};
use marionette::types::{GraphId, NodeId, Port, Priority};
use marionette::utils::json_ext::JsonSerializable;
use serde_json::json;

struct Rig {
    controller: Controller,
    idle: Probe,
    task: Probe,
    task_b: Probe,
    idle_node: NodeId,
    resumed_node: NodeId,
}

/// Builds a controller whose routine carries a caller-chosen id, so a
/// second controller can restore snapshots taken from the first.
fn rig(routine_id: GraphId) -> Rig {
    let idle = Probe::new();
    let task = Probe::new();
    let task_b = Probe::new();
    let registry = probe_registry(&[
        ("idle", idle.clone()),
        ("resumed", Probe::new()),
        ("task", task.clone()),
        ("task_b", task_b.clone()),
    ]);
    let fixture = routine_graph_with_id(routine_id);
    let controller = Controller::new(fixture.graph, registry, ControllerConfig::new());
    Rig {
        controller,
        idle,
        task,
        task_b,
        idle_node: fixture.idle,
        resumed_node: fixture.resumed,
    }
}

fn interrupt_options(priority: i32) -> RequestOptions {
    RequestOptions::new()
        .savable(true)
        .ephemeral(true)
        .priority(Priority(priority))
}

/// Drives a rig into a representative mid-session shape: task active,
/// task_b queued, routine parked.
fn busy_rig(routine_id: GraphId) -> (Rig, GraphId, GraphId) {
    let mut rig = rig(routine_id);
    rig.controller.tick();

    let active = task_graph("task");
    let active_id = active.graph.id();
    assert!(rig.controller.enqueue(active.graph, true, interrupt_options(5)));

    let queued = task_graph("task_b");
    let queued_id = queued.graph.id();
    assert!(rig.controller.enqueue(queued.graph, false, interrupt_options(3)));

    (rig, active_id, queued_id)
}

#[test]
fn snapshot_captures_the_scheduler_shape() {
    let routine_id = GraphId::new();
    let (rig, active_id, queued_id) = busy_rig(routine_id);

    let snapshot = rig.controller.snapshot();

    let active = snapshot.active.as_ref().expect("active context");
    assert_eq!(active.graph, active_id);
    assert_eq!(active.priority, Priority(5));
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].graph, queued_id);

    let parked = snapshot.saved_routine.as_ref().expect("parked routine");
    assert_eq!(parked.graph, routine_id);
    assert_eq!(parked.node, rig.resumed_node);

    // Graphs carry everything except the authored routine.
    let ids: Vec<GraphId> = snapshot.graphs.iter().map(|g| g.id).collect();
    assert!(ids.contains(&active_id));
    assert!(ids.contains(&queued_id));
    assert!(!ids.contains(&routine_id));
}

#[test]
fn load_restores_contexts_and_reactivates_the_cursor() {
    let routine_id = GraphId::new();
    let (source, active_id, queued_id) = busy_rig(routine_id);
    let snapshot = source.controller.snapshot();

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, false)
        .expect("load");

    assert_eq!(restored.controller.active_graph(), Some(active_id));
    assert_eq!(restored.controller.active_priority(), Some(Priority(5)));
    assert!(restored.controller.has_live_instance());
    assert_eq!(restored.task.configured(), 1);
    assert_eq!(restored.controller.queue_len(), 1);
    assert!(restored.controller.has_saved_routine());
    assert!(restored.controller.graph(queued_id).is_some());
}

#[test]
fn round_trip_preserves_the_snapshot() {
    let routine_id = GraphId::new();
    let (source, _, _) = busy_rig(routine_id);
    let snapshot = source.controller.snapshot();

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot.clone(), false)
        .expect("load");
    let second = restored.controller.snapshot();

    assert_eq!(second.active, snapshot.active);
    assert_eq!(second.queue, snapshot.queue);
    assert_eq!(second.saved_routine, snapshot.saved_routine);
    assert_eq!(second.idle_on_exit, snapshot.idle_on_exit);

    // Graph order is map-iteration order; compare as sets.
    let mut before = snapshot.graphs.clone();
    before.sort_by_key(|graph| graph.id.0);
    let mut after = second.graphs.clone();
    after.sort_by_key(|graph| graph.id.0);
    assert_eq!(after, before);
}

#[test]
fn blank_load_discards_the_payload_and_restarts_the_routine() {
    let routine_id = GraphId::new();
    let (source, active_id, queued_id) = busy_rig(routine_id);
    let snapshot = source.controller.snapshot();

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, true)
        .expect("blank load");

    assert_eq!(restored.controller.active_graph(), Some(routine_id));
    assert_eq!(restored.controller.active_node(), Some(restored.idle_node));
    assert_eq!(restored.controller.queue_len(), 0);
    assert!(!restored.controller.has_saved_routine());
    assert!(restored.controller.graph(active_id).is_none());
    assert!(restored.controller.graph(queued_id).is_none());
    assert_eq!(restored.idle.configured(), 1);
}

#[test]
fn load_resume_port_is_followed_on_restore() {
    let routine_id = GraphId::new();

    // "task" runs a one-shot warmup; restoring mid-run skips straight to
    // the "task_b" stage through the load-resume port.
    let mut builder = GraphBuilder::new();
    let warmup = builder.add_behavior(BehaviorNode::new("task", json!({}), ["done"]));
    let resume = builder.add_behavior(BehaviorNode::new("task_b", json!({}), ["done"]));
    let exit = builder.exit();
    builder.set_entry(warmup);
    builder.connect(warmup, "done", resume);
    builder.connect(warmup, Port::LOAD_RESUME, resume);
    builder.connect(warmup, Port::INTERRUPTED, warmup);
    builder.connect(resume, "done", exit);
    let graph = builder.build();
    let graph_id = graph.id();

    let mut source = rig(routine_id);
    source.controller.tick();
    assert!(source.controller.enqueue(graph, true, interrupt_options(5)));
    assert_eq!(source.controller.active_node(), Some(warmup));
    let snapshot = source.controller.snapshot();

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, false)
        .expect("load");

    assert_eq!(restored.controller.active_graph(), Some(graph_id));
    assert_eq!(restored.controller.active_node(), Some(resume));
    assert_eq!(restored.task.configured(), 0);
    assert_eq!(restored.task_b.configured(), 1);
}

#[test]
fn missing_saved_node_falls_back_to_the_graph_entry() {
    let routine_id = GraphId::new();
    let (source, active_id, _) = busy_rig(routine_id);
    let mut snapshot = source.controller.snapshot();

    // Simulate the graph having been edited since the save.
    snapshot.active.as_mut().expect("active context").node = NodeId(99);

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, false)
        .expect("load");

    let entry = restored
        .controller
        .graph(active_id)
        .and_then(|graph| graph.entry())
        .expect("restored graph entry");
    assert_eq!(restored.controller.active_graph(), Some(active_id));
    assert_eq!(restored.controller.active_node(), Some(entry));
}

#[test]
fn context_for_an_unknown_graph_is_dropped_on_load() {
    let routine_id = GraphId::new();
    let (source, active_id, _) = busy_rig(routine_id);
    let mut snapshot = source.controller.snapshot();

    snapshot.queue[0].graph = GraphId::new();

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, false)
        .expect("load");

    assert_eq!(restored.controller.active_graph(), Some(active_id));
    assert_eq!(restored.controller.queue_len(), 0);
}

#[test]
fn snapshot_survives_a_json_round_trip() {
    let routine_id = GraphId::new();
    let (source, _, _) = busy_rig(routine_id);
    let snapshot = source.controller.snapshot();

    let json = snapshot.to_json_string().expect("serialize");
    let parsed = marionette::controller::ControllerSnapshot::from_json_str(&json)
        .expect("deserialize");
    assert_eq!(parsed, snapshot);

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(parsed, false)
        .expect("load");
    assert!(restored.controller.has_live_instance());
}

#[test]
fn idle_policy_travels_with_the_snapshot() {
    let routine_id = GraphId::new();
    let idle_probe = Probe::new();
    let registry = probe_registry(&[("idle", idle_probe.clone()), ("resumed", Probe::new())]);
    let fixture = routine_graph_with_id(routine_id);
    let controller = Controller::new(
        fixture.graph,
        registry,
        ControllerConfig::new().with_idle_on_exit(true),
    );
    let snapshot = controller.snapshot();
    assert!(snapshot.idle_on_exit);

    let mut restored = rig(routine_id);
    restored
        .controller
        .load_snapshot(snapshot, false)
        .expect("load");

    // The restored controller inherits the idle policy: nothing to run,
    // nothing started.
    assert!(restored.controller.is_idle());
    assert_eq!(restored.idle.configured(), 0);
}
