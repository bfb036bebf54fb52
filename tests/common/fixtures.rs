//! Canonical graph fixtures used across the integration suites.

use marionette::graph::{BehaviorNode, Graph, GraphBuilder};
use marionette::types::{GraphId, NodeId, Port};
use serde_json::json;

/// Routine fixture: an "idle" behavior that runs until steered, whose
/// "interrupted" port resumes at a distinct "resumed" node so tests can
/// observe that resumption went through the port rather than the entry.
pub struct RoutineFixture {
    pub graph: Graph,
    pub idle: NodeId,
    pub resumed: NodeId,
}

pub fn routine_graph() -> RoutineFixture {
    routine_graph_with_id(GraphId::new())
}

pub fn routine_graph_with_id(id: GraphId) -> RoutineFixture {
    let mut builder = GraphBuilder::with_id(id);
    let idle = builder.add_behavior(BehaviorNode::new("idle", json!({}), ["done"]));
    let resumed = builder.add_behavior(BehaviorNode::new("resumed", json!({}), ["done"]));
    let restart = builder.add_restart();
    builder.set_entry(idle);
    builder.connect(idle, Port::INTERRUPTED, resumed);
    builder.connect(idle, "done", restart);
    builder.connect(resumed, "done", restart);
    RoutineFixture {
        graph: builder.build(),
        idle,
        resumed,
    }
}

/// One-behavior task graph: `name`'s "done" outcome reaches Exit, and its
/// "interrupted" port loops back to the node itself so a preempted task
/// resumes where it left off.
pub struct TaskFixture {
    pub graph: Graph,
    pub task: NodeId,
}

pub fn task_graph(name: &str) -> TaskFixture {
    task_graph_with_id(GraphId::new(), name)
}

pub fn task_graph_with_id(id: GraphId, name: &str) -> TaskFixture {
    let mut builder = GraphBuilder::with_id(id);
    let task = builder.add_behavior(BehaviorNode::new(name, json!({}), ["done"]));
    let exit = builder.exit();
    builder.set_entry(task);
    builder.connect(task, "done", exit);
    builder.connect(task, Port::INTERRUPTED, task);
    TaskFixture {
        graph: builder.build(),
        task,
    }
}

/// Task graph with no "interrupted" connection; preemption drops it.
pub fn unsavable_task_graph(name: &str) -> TaskFixture {
    let mut builder = GraphBuilder::new();
    let task = builder.add_behavior(BehaviorNode::new(name, json!({}), ["done"]));
    let exit = builder.exit();
    builder.set_entry(task);
    builder.connect(task, "done", exit);
    TaskFixture {
        graph: builder.build(),
        task,
    }
}

/// Graph whose entry is a JumpIn with no matching JumpOut anywhere.
pub fn broken_jump_graph() -> Graph {
    let mut builder = GraphBuilder::new();
    let jump = builder.add_jump_in("nowhere");
    builder.set_entry(jump);
    builder.build()
}
