//! Unified error type for the worker SDK core.
//!
//! Handler-level failures never surface here: per the dispatcher's contract they
//! are captured and mapped into a `failed` `WorkResponse`. `SdkError` covers only
//! the things that can stop the SDK itself from running.

use thiserror::Error;

use crate::config::ConfigError;
use crate::ports::engine_client::EngineError;

/// Top-level error returned by `WorkerClient` construction and startup.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration failed validation before anything else started.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Registration exhausted its bounded retry budget at startup.
    #[error("handler registration failed after {attempts} attempts: {source}")]
    Registration {
        attempts: u32,
        #[source]
        source: EngineError,
    },

    /// A transport-level failure not tied to a specific retry loop above.
    #[error("engine transport error: {0}")]
    Transport(#[from] EngineError),

    /// The client was asked to start after shutdown had already been requested.
    #[error("worker client shutting down")]
    Shutdown,

    /// The CPU-domain worker runtime could not be constructed.
    #[error("failed to start CPU worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
