//! Core data model: handlers, work items, step results, and the
//! per-execution context that carries a work item into nested user code.

pub mod context;
pub mod handler;
pub mod permit;
pub mod step_result;
pub mod work_item;
pub mod work_response;

pub use context::current_work_item;
pub use handler::{Handler, HandlerFn, HandlerOutcome, HandlerTable, SchedulingDomain};
pub use permit::{PermitGuard, PermitPool};
pub use step_result::{StepResult, StepStatus};
pub use work_item::WorkItem;
pub use work_response::WorkResponse;
