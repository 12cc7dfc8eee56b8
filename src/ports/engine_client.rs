//! Port for the remote orchestration engine following hexagonal architecture.
//!
//! Defines the three endpoints the core needs (register, poll, submit) without
//! committing to any particular transport. Implementations can speak HTTP, or,
//! for tests, hold everything in memory.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{WorkItem, WorkResponse};

/// Errors a transport can raise. Distinguishes transient failures (worth
/// retrying) from the structure the Submitter needs to classify a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request could not be sent or the connection failed outright.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The engine responded with a non-2xx status. Carries the status code
    /// and body so the Submitter can run its permanent-error-keyword match
    /// against it.
    #[error("engine responded {status}: {body}")]
    Response { status: u16, body: String },

    /// The response body could not be decoded as the expected shape.
    #[error("malformed engine response: {0}")]
    Decode(String),
}

impl EngineError {
    /// The text the Submitter should run its permanent-error-keyword match
    /// against: the response body for HTTP failures, the message otherwise.
    #[must_use]
    pub fn classification_text(&self) -> &str {
        match self {
            Self::Response { body, .. } => body,
            Self::Transport(message) | Self::Decode(message) => message,
        }
    }
}

/// One `(namespace, name)` pair to register with the engine for this client.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub namespace: String,
    pub name: String,
}

/// One handler's request for a batch of work, keyed the same way a
/// `HandlerTable` entry is.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub namespace: String,
    pub name: String,
    pub size: u32,
}

/// Port for the remote orchestration engine.
///
/// # Examples
///
/// ```ignore
/// async fn example(engine: &dyn EngineClient) -> Result<(), EngineError> {
///     engine.register(&[HandlerDescriptor { namespace: "default".into(), name: "echo".into() }]).await?;
///     let items = engine.poll(&[PollRequest { namespace: "default".into(), name: "echo".into(), size: 1 }]).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Announce this process's handlers to the engine.
    ///
    /// Called once at startup by the Registration Coordinator, which owns
    /// the retry loop around this call — implementations should not retry
    /// internally.
    async fn register(&self, handlers: &[HandlerDescriptor]) -> Result<(), EngineError>;

    /// Request up to `size` work items per handler in a single round-trip.
    ///
    /// Returns however many items the engine actually had available for
    /// each handler, which may be fewer than requested or zero.
    async fn poll(&self, requests: &[PollRequest]) -> Result<Vec<WorkItem>, EngineError>;

    /// Submit a batch of results. The whole batch either succeeds or fails
    /// together — the engine does not report per-item outcomes.
    async fn submit_bulk_results(&self, responses: &[WorkResponse]) -> Result<(), EngineError>;
}
