//! Adapters for the ports the core depends on.

pub mod http;
pub mod logging;

pub use http::ReqwestEngineClient;
