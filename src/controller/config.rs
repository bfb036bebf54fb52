//! Controller configuration.

/// Static configuration applied at controller construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerConfig {
    /// When `true`, the controller goes idle after the queue drains instead
    /// of falling back to the routine graph.
    pub idle_on_exit: bool,
}

impl ControllerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle-on-exit policy.
    #[must_use]
    pub fn with_idle_on_exit(mut self, idle_on_exit: bool) -> Self {
        self.idle_on_exit = idle_on_exit;
        self
    }
}
