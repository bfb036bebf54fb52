//! Controllable test behaviors.
//!
//! `Probe` hands out shared atomic handles so tests can steer a behavior
//! (finish it, make it refuse interrupts) and observe its lifecycle
//! (configure count, poll count, drop count) from the outside while the
//! controller owns the boxed instance.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use marionette::behavior::{Behavior, BehaviorError, BehaviorRegistry, BehaviorStatus};
use serde_json::Value;

/// Shared handle into every instance a registry constructor produces for
/// one behavior name.
#[derive(Clone)]
pub struct Probe {
    configured: Arc<AtomicUsize>,
    polls: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    accept_interrupt: Arc<AtomicBool>,
    exit_with: Arc<Mutex<Option<String>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self {
            configured: Arc::new(AtomicUsize::new(0)),
            polls: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicUsize::new(0)),
            accept_interrupt: Arc::new(AtomicBool::new(true)),
            exit_with: Arc::new(Mutex::new(None)),
        }
    }

    /// Number of instances that configured successfully.
    pub fn configured(&self) -> usize {
        self.configured.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Number of instances dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Instances currently alive (configured minus dropped).
    pub fn live(&self) -> usize {
        self.configured() - self.dropped()
    }

    /// Make the next poll of the live instance exit with `outcome`.
    pub fn finish(&self, outcome: &str) {
        *self.exit_with.lock().unwrap() = Some(outcome.to_owned());
    }

    pub fn refuse_interrupts(&self, refuse: bool) {
        self.accept_interrupt.store(!refuse, Ordering::SeqCst);
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::new()
    }
}

struct ProbeBehavior {
    probe: Probe,
}

impl Behavior for ProbeBehavior {
    fn configure(&mut self, config: &Value) -> Result<(), BehaviorError> {
        if config.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Err(BehaviorError::InvalidConfig(
                "scripted configure failure".into(),
            ));
        }
        self.probe.configured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn poll(&mut self) -> BehaviorStatus {
        self.probe.polls.fetch_add(1, Ordering::SeqCst);
        match self.probe.exit_with.lock().unwrap().take() {
            Some(outcome) => BehaviorStatus::Exited(outcome),
            None => BehaviorStatus::Running,
        }
    }

    fn interrupt(&mut self) -> bool {
        self.probe.accept_interrupt.load(Ordering::SeqCst)
    }
}

impl Drop for ProbeBehavior {
    fn drop(&mut self) {
        self.probe.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Exits after a configured number of polls. Unlike `Probe` it carries no
/// shared state, so it survives snapshot round-trips unchanged.
struct CountDown {
    remaining: u64,
    outcome: String,
}

impl Behavior for CountDown {
    fn configure(&mut self, config: &Value) -> Result<(), BehaviorError> {
        self.remaining = config
            .get("ticks")
            .and_then(Value::as_u64)
            .ok_or_else(|| BehaviorError::MissingConfig { what: "ticks" })?;
        self.outcome = config
            .get("outcome")
            .and_then(Value::as_str)
            .unwrap_or("done")
            .to_owned();
        Ok(())
    }

    fn poll(&mut self) -> BehaviorStatus {
        if self.remaining == 0 {
            return BehaviorStatus::exited(&self.outcome);
        }
        self.remaining -= 1;
        BehaviorStatus::Running
    }
}

/// Registers probe-backed constructors for each `(name, probe)` pair, plus
/// the self-contained `"countdown"` behavior.
pub fn probe_registry(probes: &[(&str, Probe)]) -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    for (name, probe) in probes {
        let probe = probe.clone();
        registry.register(*name, move || {
            Box::new(ProbeBehavior {
                probe: probe.clone(),
            })
        });
    }
    registry.register("countdown", || {
        Box::new(CountDown {
            remaining: 0,
            outcome: String::new(),
        })
    });
    registry
}
