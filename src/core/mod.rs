//! The scheduling core: Registration Coordinator, Polling Controller, Work
//! Dispatcher, and Response Submitter, wired together by `WorkerClient`.

pub mod client;
pub mod dispatcher;
pub mod poller;
pub mod registration;
pub mod submitter;

pub use client::WorkerClient;
pub use dispatcher::Dispatcher;
pub use poller::PollingController;
pub use submitter::{ResponseSubmitter, SubmissionTracker, SubmitterConfig};
