//! Tracing setup for hosts that want the engine's diagnostics on stderr.
//!
//! The engine itself only *emits* through the [`tracing`] macros; wiring a
//! subscriber is the host's job. [`init`] installs a sensible default,
//! an fmt layer filtered by `RUST_LOG` (falling back to `info`), for
//! binaries and tests that have no subscriber of their own.

use tracing_subscriber::EnvFilter;

/// Installs the default fmt subscriber with `RUST_LOG` filtering.
///
/// Safe to call more than once; only the first call installs.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
