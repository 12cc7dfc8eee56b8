//! Core runtime for a worker-host SDK.
//!
//! Connects a worker-host process to a remote orchestration engine:
//! announces the handlers it offers, continuously pulls work in
//! credit-sized batches, dispatches each item to its registered handler
//! under bounded per-handler concurrency, and submits results back in
//! durable, batched, retrying fashion.
//!
//! The engine transport, handler-registration surfaces (attribute/annotation
//! scanning), and process-management client are deliberately out of scope —
//! this crate consumes a prepared [`domain::HandlerTable`] and an
//! [`ports::EngineClient`] implementation.

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;
pub mod stats;

pub use config::{ConfigError, ConfigLoader, SdkConfig};
pub use core::WorkerClient;
pub use domain::{
    current_work_item, Handler, HandlerFn, HandlerOutcome, HandlerTable, SchedulingDomain,
    StepResult, StepStatus, WorkItem, WorkResponse,
};
pub use error::{SdkError, SdkResult};
pub use ports::{EngineClient, EngineError};
pub use stats::{SdkStats, SdkStatsSnapshot};
