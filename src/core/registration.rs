//! Registration Coordinator: announces the Handler Table to the engine once
//! at startup, with bounded linear-plus-ceiling backoff.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::HandlerTable;
use crate::ports::engine_client::{EngineClient, EngineError, HandlerDescriptor};

/// 1s, 3s, 5s, ... capped at 10s between attempts, per the engine's
/// registration contract.
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 10;

fn backoff_for_attempt(attempt: u32) -> Duration {
    let seconds = u64::from(attempt).saturating_mul(2).saturating_add(1);
    Duration::from_secs(seconds).min(MAX_BACKOFF)
}

/// Announce every handler in `table` to the engine, retrying transient
/// failures with a bounded linear-plus-ceiling schedule. Returns the number
/// of attempts made on success; on exhaustion returns the final error along
/// with the attempt count so the caller can build a fatal `SdkError`.
pub async fn register_all(
    engine: &Arc<dyn EngineClient>,
    table: &HandlerTable,
) -> Result<u32, (u32, EngineError)> {
    let descriptors: Vec<HandlerDescriptor> = table
        .iter()
        .map(|handler| HandlerDescriptor {
            namespace: handler.namespace.clone(),
            name: handler.name.clone(),
        })
        .collect();

    let mut attempt = 0;
    loop {
        attempt += 1;
        match engine.register(&descriptors).await {
            Ok(()) => {
                info!(attempt, handler_count = descriptors.len(), "registered handlers with engine");
                return Ok(attempt);
            }
            Err(err) => {
                if attempt >= MAX_ATTEMPTS {
                    error!(attempt, %err, "registration exhausted retry budget");
                    return Err((attempt, err));
                }
                let backoff = backoff_for_attempt(attempt - 1);
                warn!(attempt, %err, backoff_secs = backoff.as_secs(), "registration attempt failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
