//! Optional tracing-subscriber bootstrap.
//!
//! This crate is a library: it instruments its own entry points with
//! `tracing` but never installs a global subscriber on its own — the
//! embedding host owns that decision. `init_tracing` is offered purely as a
//! convenience for hosts, examples, and integration tests that want the same
//! stdout layout the SDK's own test suite uses.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stdout `tracing` subscriber honoring `RUST_LOG`, defaulting to
/// `info` when unset. Returns an error if a global subscriber is already
/// installed.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).try_init()
}
