//! The handler table: an in-memory, read-only-after-construction registry of
//! user-supplied step handlers keyed by `(namespace, name)`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::permit::PermitPool;
use super::step_result::StepStatus;
use super::work_item::WorkItem;

/// Which scheduling domain a handler should run in.
///
/// I/O-bound handlers run on the ambient cooperative runtime unbounded;
/// CPU-bound handlers are served from a bounded worker pool so they cannot
/// starve I/O handlers sharing the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingDomain {
    Io,
    Cpu,
}

/// What a handler invocation produced, before the dispatcher normalizes it
/// into a `StepResult`.
///
/// Mirrors the three cases the dispatcher's output-mapping rule names:
/// a pre-shaped result, a bare output map, or an arbitrary JSON-compatible
/// scalar/list/object to be wrapped.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// The handler returned something that already carries its own status,
    /// output, and (optionally) a reschedule delay.
    Shaped {
        status: StepStatus,
        output: Map<String, Value>,
        reschedule_after_seconds: Option<i64>,
    },
    /// The handler returned a bare map; status defaults to `completed`.
    Output(Map<String, Value>),
    /// The handler returned a primitive, list, or other JSON-compatible
    /// value; the dispatcher wraps it as `{"result": value}`.
    Scalar(Value),
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler's invocation function: takes the work item's input map (and the
/// work item itself, for handlers that need identity fields) and produces an
/// outcome, or an error message if the handler "threw".
pub type HandlerFn = Arc<
    dyn Fn(Arc<WorkItem>) -> BoxFuture<'static, Result<HandlerOutcome, String>> + Send + Sync,
>;

/// One registered step handler.
///
/// Owns its `PermitPool` for the lifetime of the process: the pool is sized
/// to `max_in_progress` at registration and never resized afterward.
#[derive(Clone)]
pub struct Handler {
    pub namespace: String,
    pub name: String,
    pub invoke: HandlerFn,
    pub max_in_progress: u32,
    pub domain: SchedulingDomain,
    pub permits: PermitPool,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("max_in_progress", &self.max_in_progress)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Read-only-after-construction registry of handlers, keyed by
/// `(namespace, name)`.
///
/// Populated via `HandlerTableBuilder` before the SDK starts; handlers are
/// immutable for the lifetime of the process once built.
pub struct HandlerTable {
    handlers: HashMap<(String, String), Arc<Handler>>,
}

impl HandlerTable {
    #[must_use]
    pub fn builder() -> HandlerTableBuilder {
        HandlerTableBuilder::default()
    }

    #[must_use]
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<Handler>> {
        self.handlers
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Handler>> {
        self.handlers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builder for `HandlerTable`; registration order does not matter, the
/// `(namespace, name)` key must be unique per handler.
#[derive(Default)]
pub struct HandlerTableBuilder {
    handlers: HashMap<(String, String), Arc<Handler>>,
}

impl HandlerTableBuilder {
    /// Register a handler. Panics if `(namespace, name)` was already
    /// registered or `max_in_progress` is zero — both are programmer errors
    /// caught at startup, not runtime conditions.
    #[must_use]
    pub fn register(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        max_in_progress: u32,
        domain: SchedulingDomain,
        invoke: HandlerFn,
    ) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        assert!(max_in_progress >= 1, "max_in_progress must be at least 1");

        let key = (namespace.clone(), name.clone());
        let previous = self.handlers.insert(
            key,
            Arc::new(Handler {
                namespace,
                name,
                invoke,
                max_in_progress,
                domain,
                permits: PermitPool::new(max_in_progress),
            }),
        );
        assert!(
            previous.is_none(),
            "duplicate handler registration for the same (namespace, name)"
        );
        self
    }

    #[must_use]
    pub fn build(self) -> HandlerTable {
        HandlerTable {
            handlers: self.handlers,
        }
    }
}
