//! Shared test fixtures: an in-memory `EngineClient` stub used by the
//! in-process scenario tests (S5, S6) and unit-level scenario coverage that
//! doesn't need a real HTTP layer.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use unmeshed_worker_sdk::domain::{HandlerOutcome, SchedulingDomain, WorkItem, WorkResponse};
use unmeshed_worker_sdk::ports::engine_client::{
    EngineClient, EngineError, HandlerDescriptor, PollRequest,
};

/// In-memory engine double: `poll` hands out queued work items one per
/// matching request, `submit_bulk_results` records every response it was
/// given for later assertions.
#[derive(Default)]
pub struct StubEngineClient {
    queued_items: Mutex<VecDeque<WorkItem>>,
    submitted: Mutex<Vec<WorkResponse>>,
    registered: Mutex<Vec<HandlerDescriptor>>,
}

impl StubEngineClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_item(&self, item: WorkItem) {
        self.queued_items.lock().unwrap().push_back(item);
    }

    #[must_use]
    pub fn submitted(&self) -> Vec<WorkResponse> {
        self.submitted.lock().unwrap().clone()
    }

    #[must_use]
    pub fn registered(&self) -> Vec<HandlerDescriptor> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineClient for StubEngineClient {
    async fn register(&self, handlers: &[HandlerDescriptor]) -> Result<(), EngineError> {
        self.registered.lock().unwrap().extend(
            handlers
                .iter()
                .map(|h| HandlerDescriptor { namespace: h.namespace.clone(), name: h.name.clone() }),
        );
        Ok(())
    }

    async fn poll(&self, requests: &[PollRequest]) -> Result<Vec<WorkItem>, EngineError> {
        let mut queue = self.queued_items.lock().unwrap();
        let mut out = Vec::new();

        for request in requests {
            let mut taken = 0;
            while taken < request.size {
                let Some(position) = queue
                    .iter()
                    .position(|item| item.step_namespace == request.namespace && item.step_name == request.name)
                else {
                    break;
                };
                out.push(queue.remove(position).unwrap());
                taken += 1;
            }
        }

        Ok(out)
    }

    async fn submit_bulk_results(&self, responses: &[WorkResponse]) -> Result<(), EngineError> {
        self.submitted.lock().unwrap().extend(responses.iter().cloned());
        Ok(())
    }
}

#[must_use]
pub fn sample_work_item(
    step_execution_id: i64,
    step_namespace: &str,
    step_name: &str,
    input: Map<String, Value>,
) -> WorkItem {
    serde_json::from_value(serde_json::json!({
        "stepId": step_execution_id,
        "processId": step_execution_id,
        "stepExecutionId": step_execution_id,
        "runCount": 1,
        "stepName": step_name,
        "stepNamespace": step_namespace,
        "inputParam": input,
        "isOptional": false,
        "polled": true,
        "priority": 0,
    }))
    .expect("valid work item fixture")
}

#[allow(dead_code)]
pub fn io_domain() -> SchedulingDomain {
    SchedulingDomain::Io
}

#[allow(dead_code)]
pub fn cpu_domain() -> SchedulingDomain {
    SchedulingDomain::Cpu
}

#[allow(dead_code)]
pub fn empty_outcome() -> HandlerOutcome {
    HandlerOutcome::Output(Map::new())
}
