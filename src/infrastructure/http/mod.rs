//! HTTP adapter for the engine transport port.

pub mod auth;
pub mod reqwest_client;

pub use reqwest_client::ReqwestEngineClient;
