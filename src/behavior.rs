//! Behavior protocol for the marionette engine.
//!
//! This module defines the contract every pluggable behavior must satisfy,
//! plus the [`BehaviorRegistry`] the controller uses to instantiate concrete
//! behavior types by name.
//!
//! The protocol is deliberately small: the controller only ever depends on
//! three operations:
//!
//! 1. [`Behavior::configure`]: apply the node's configuration payload (may
//!    fail; failure aborts activation, not the controller)
//! 2. [`Behavior::poll`]: advance one tick, returning [`BehaviorStatus`];
//!    the `Exited` variant is the synchronous exit signal the controller
//!    consumes on the same tick it was raised
//! 3. [`Behavior::interrupt`]: a voluntary yield query; a behavior may
//!    refuse (e.g. mid-commit), and the controller never force-preempts
//!
//! # Examples
//!
//! ```rust
//! use marionette::behavior::{Behavior, BehaviorError, BehaviorStatus};
//! use serde_json::Value;
//!
//! struct WaitTicks {
//!     remaining: u32,
//! }
//!
//! impl WaitTicks {
//!     pub const DONE: &'static str = "done";
//! }
//!
//! impl Behavior for WaitTicks {
//!     fn configure(&mut self, config: &Value) -> Result<(), BehaviorError> {
//!         self.remaining = config
//!             .get("ticks")
//!             .and_then(Value::as_u64)
//!             .ok_or(BehaviorError::MissingConfig { what: "ticks" })? as u32;
//!         Ok(())
//!     }
//!
//!     fn poll(&mut self) -> BehaviorStatus {
//!         if self.remaining == 0 {
//!             BehaviorStatus::exited(Self::DONE)
//!         } else {
//!             self.remaining -= 1;
//!             BehaviorStatus::Running
//!         }
//!     }
//! }
//! ```

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Core Trait
// ============================================================================

/// A pluggable behavior driven by the controller, one tick at a time.
///
/// Implementations own whatever runtime state they need; the engine treats
/// them as opaque. Exactly one behavior instance is live per controller at
/// any observation point: the instance slot lives on the active
/// [`ExecutionContext`](crate::context::ExecutionContext).
pub trait Behavior {
    /// Apply the behavior node's configuration payload.
    ///
    /// Called once, immediately after construction and before the first
    /// [`poll`](Self::poll). A failure here aborts the activation: the
    /// half-built instance is dropped and the owning context is discarded,
    /// so a misconfigured node cannot respawn in a loop.
    fn configure(&mut self, config: &Value) -> Result<(), BehaviorError>;

    /// Advance one tick.
    ///
    /// Returning [`BehaviorStatus::Exited`] signals completion with one
    /// value from this behavior's outcome enumeration; the controller
    /// resolves the next node along the port named for that outcome in the
    /// same driving call.
    fn poll(&mut self) -> BehaviorStatus;

    /// Voluntary yield query.
    ///
    /// Returning `false` refuses the interruption and the whole preempting
    /// request fails with no state change. The default accepts.
    fn interrupt(&mut self) -> bool {
        true
    }
}

/// Tick result of a running behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BehaviorStatus {
    /// Still running; poll again next tick.
    Running,
    /// Finished with the named outcome. The name must match one of the
    /// outcome ports declared on the behavior node.
    Exited(String),
}

impl BehaviorStatus {
    /// Convenience constructor for [`BehaviorStatus::Exited`].
    #[must_use]
    pub fn exited(outcome: impl Into<String>) -> Self {
        Self::Exited(outcome.into())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Constructor for a concrete behavior type.
pub type BehaviorConstructor = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// Maps behavior type names to constructors.
///
/// Behavior nodes reference their concrete type by a registry key, which
/// keeps graphs fully serializable: a snapshot stores the key and the
/// configuration payload, and restore looks the constructor up here. The
/// set of registered types is closed at controller construction; there is
/// no runtime type discovery.
///
/// # Examples
///
/// ```rust
/// use marionette::behavior::{Behavior, BehaviorError, BehaviorRegistry, BehaviorStatus};
/// # struct Idle;
/// # impl Behavior for Idle {
/// #     fn configure(&mut self, _: &serde_json::Value) -> Result<(), BehaviorError> { Ok(()) }
/// #     fn poll(&mut self) -> BehaviorStatus { BehaviorStatus::exited("done") }
/// # }
///
/// let registry = BehaviorRegistry::new().with("idle", || Box::new(Idle));
/// assert!(registry.contains("idle"));
/// assert!(registry.construct("patrol").is_none());
/// ```
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    constructors: FxHashMap<String, BehaviorConstructor>,
}

impl BehaviorRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: FxHashMap::default(),
        }
    }

    /// Registers a constructor for a behavior type name.
    ///
    /// Registering the same name twice replaces the earlier constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Behavior> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    /// Builder-style registration, for fluent construction.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Behavior> + Send + Sync + 'static,
    {
        self.register(name, constructor);
        self
    }

    /// Returns `true` if a constructor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Constructs a fresh, unconfigured instance of the named behavior.
    ///
    /// Returns `None` for unknown names; the controller treats that as a
    /// structural graph error and aborts the context.
    #[must_use]
    pub fn construct(&self, name: &str) -> Option<Box<dyn Behavior>> {
        self.constructors.get(name).map(|ctor| ctor())
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by a behavior while being configured.
///
/// Configuration failures are caught at the activation boundary: the
/// controller drops the half-built instance and aborts the owning context.
/// They never surface to the caller of a controller operation.
#[derive(Debug, Error, Diagnostic)]
pub enum BehaviorError {
    /// A required configuration field is missing.
    #[error("missing configuration field: {what}")]
    #[diagnostic(
        code(marionette::behavior::missing_config),
        help("Populate the field on the behavior node's configuration payload.")
    )]
    MissingConfig { what: &'static str },

    /// A configuration field has an unusable value.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(marionette::behavior::invalid_config))]
    InvalidConfig(String),

    /// JSON deserialization of the configuration payload failed.
    #[error(transparent)]
    #[diagnostic(code(marionette::behavior::serde_json))]
    Serde(#[from] serde_json::Error),
}
