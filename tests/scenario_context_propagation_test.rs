//! S6 (context propagation): many concurrent handler executions, each
//! reading the Context Carrier after at least one suspension point and
//! again inside a nested call, must only ever observe their own Work Item —
//! never another concurrently-running execution's.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use unmeshed_worker_sdk::domain::{HandlerOutcome, SchedulingDomain, WorkItem};
use unmeshed_worker_sdk::{current_work_item, HandlerTable, SdkConfig, WorkerClient};

use common::{sample_work_item, StubEngineClient};

const EXECUTION_COUNT: i64 = 20;

/// Reads the ambient context after a further suspension and records a
/// mismatch instead of panicking, since this runs inside a detached spawned
/// task where a panic would not fail the test.
async fn check_nested_context(expected: &WorkItem, mismatches: &AtomicUsize) {
    tokio::task::yield_now().await;
    let observed = current_work_item();
    match observed {
        Some(observed)
            if observed.step_execution_id == expected.step_execution_id
                && observed.step_name == expected.step_name => {}
        _ => {
            mismatches.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn s6_concurrent_executions_never_observe_each_others_context() {
    let engine = Arc::new(StubEngineClient::new());
    let mismatches = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicBool::new(false));
    let completed_count = Arc::new(AtomicUsize::new(0));

    let mut builder = HandlerTable::builder();
    for i in 0..EXECUTION_COUNT {
        let step_name = format!("Step-{i}");
        engine.push_item(sample_work_item(i, "default", &step_name, Map::new()));

        let mismatches = Arc::clone(&mismatches);
        let completed_count = Arc::clone(&completed_count);
        builder = builder.register(
            "default",
            &step_name,
            1,
            SchedulingDomain::Io,
            Arc::new(move |work_item: Arc<WorkItem>| {
                let mismatches = Arc::clone(&mismatches);
                let completed_count = Arc::clone(&completed_count);
                Box::pin(async move {
                    tokio::task::yield_now().await;

                    let observed = current_work_item();
                    match observed {
                        Some(observed)
                            if observed.step_execution_id == work_item.step_execution_id
                                && observed.step_name == work_item.step_name => {}
                        _ => {
                            mismatches.fetch_add(1, Ordering::SeqCst);
                        }
                    }

                    check_nested_context(&work_item, &mismatches).await;

                    completed_count.fetch_add(1, Ordering::SeqCst);
                    Ok(HandlerOutcome::Output(Map::new()))
                })
            }),
        );
    }
    let handlers = builder.build();

    let config = SdkConfig {
        client_id: "x".to_string(),
        auth_token: "y".to_string(),
        initial_delay_millis: 0,
        ..SdkConfig::default()
    };

    let client = Arc::new(
        WorkerClient::with_engine(
            config,
            handlers,
            Arc::clone(&engine) as Arc<dyn unmeshed_worker_sdk::EngineClient>,
        )
        .unwrap(),
    );

    client.start().await.unwrap();

    for _ in 0..20 {
        if completed_count.load(Ordering::SeqCst) as i64 == EXECUTION_COUNT {
            completed.store(true, Ordering::SeqCst);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    client.shutdown().await.unwrap();

    assert!(completed.load(Ordering::SeqCst), "all 20 executions should have completed");
    assert_eq!(mismatches.load(Ordering::SeqCst), 0, "no execution observed another's context");
    assert_eq!(engine.submitted().len(), EXECUTION_COUNT as usize);
}
