//! Hexagonal ports: interfaces the core depends on without knowing about
//! any particular transport.

pub mod engine_client;

pub use engine_client::{EngineClient, EngineError, HandlerDescriptor, PollRequest};
