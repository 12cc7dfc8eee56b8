//! `WorkerClient`: the public entry point wiring the Handler Table,
//! Dispatcher, Polling Controller, and Response Submitter together, and
//! coordinating startup registration and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SdkConfig;
use crate::domain::HandlerTable;
use crate::error::{SdkError, SdkResult};
use crate::infrastructure::http::ReqwestEngineClient;
use crate::ports::engine_client::EngineClient;
use crate::stats::{SdkStats, SdkStatsSnapshot};

use super::dispatcher::Dispatcher;
use super::poller::PollingController;
use super::registration;
use super::submitter::{ResponseSubmitter, SubmitterConfig};

/// Grace period `shutdown()` waits for the poll/submit loops to notice the
/// signal and exit before giving up on a clean join.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The worker-host SDK's runtime: owns the Poller, Dispatcher, and
/// Submitter, and drives their lifecycle.
pub struct WorkerClient {
    config: SdkConfig,
    engine: Arc<dyn EngineClient>,
    handlers: Arc<HandlerTable>,
    dispatcher: Arc<Dispatcher>,
    poller: Arc<PollingController>,
    submitter: Arc<ResponseSubmitter>,
    stats: Arc<SdkStats>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerClient {
    /// Build a client against the real HTTP engine transport, composing the
    /// server URL and bearer token from `config`.
    pub fn new(config: SdkConfig, handlers: HandlerTable) -> SdkResult<Self> {
        config.validate().map_err(SdkError::Config)?;

        let engine = Arc::new(ReqwestEngineClient::new(
            config.server_url(),
            &config.client_id,
            &config.auth_token,
            Duration::from_secs(config.connection_timeout_seconds),
        )?);

        Self::with_engine(config, handlers, engine)
    }

    /// Build a client against an injected `EngineClient`, for tests and for
    /// embedding hosts that supply their own transport.
    pub fn with_engine(
        config: SdkConfig,
        handlers: HandlerTable,
        engine: Arc<dyn EngineClient>,
    ) -> SdkResult<Self> {
        config.validate().map_err(SdkError::Config)?;

        let handlers = Arc::new(handlers);
        let stats = Arc::new(SdkStats::new());

        let submitter = Arc::new(ResponseSubmitter::new(
            Arc::clone(&engine),
            SubmitterConfig {
                batch_size: config.response_submit_batch_size as usize,
                max_submit_attempts: config.max_submit_attempts,
                permanent_error_keywords: config.permanent_error_keywords.clone(),
                enabled: config.enable_batch_processing,
            },
            Arc::clone(&stats),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&handlers),
            Arc::clone(&submitter),
            config.fixed_thread_pool_size,
            config.step_timeout_millis,
        )?);

        let poller = Arc::new(PollingController::new(
            Arc::clone(&handlers),
            Arc::clone(&engine),
            Arc::clone(&dispatcher),
            config.work_request_batch_size,
            Arc::clone(&stats),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            engine,
            handlers,
            dispatcher,
            poller,
            submitter,
            stats,
            shutdown_tx,
            shutdown_rx,
            task_handles: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Announce this process's handlers to the engine (retrying per the
    /// bounded backoff schedule) and start the poll/submit loops.
    ///
    /// When `enable_batch_processing` is `false`, this is a no-op beyond
    /// logging: no registration, no polling, no submitting. This preserves
    /// the existing observable behavior of the flag rather than guessing at
    /// a refined "batching off but still submitting synchronously" meaning.
    pub async fn start(self: &Arc<Self>) -> SdkResult<()> {
        if !self.config.enable_batch_processing {
            info!("enable_batch_processing is false; start() is a no-op");
            return Ok(());
        }

        if *self.shutdown_rx.borrow() {
            return Err(SdkError::Shutdown);
        }

        if self.config.initial_delay_millis > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.initial_delay_millis)).await;
        }

        registration::register_all(&self.engine, &self.handlers)
            .await
            .map_err(|(attempts, source)| SdkError::Registration { attempts, source })?;

        let poller = Arc::clone(&self.poller);
        let poller_shutdown_rx = self.shutdown_rx.clone();
        let poll_handle = tokio::spawn(async move {
            poller.run(poller_shutdown_rx).await;
        });

        let submitter = Arc::clone(&self.submitter);
        let submitter_shutdown_rx = self.shutdown_rx.clone();
        let submit_handle = tokio::spawn(async move {
            submitter.run(submitter_shutdown_rx).await;
        });

        let mut handles = self.task_handles.lock().await;
        handles.push(poll_handle);
        handles.push(submit_handle);

        info!("worker client started");
        Ok(())
    }

    /// Signal the poll and submit loops to stop spawning new work, then wait
    /// (bounded by a grace period) for them to exit. In-flight dispatches
    /// are not cancelled.
    pub async fn shutdown(&self) -> SdkResult<()> {
        let _ = self.shutdown_tx.send(true);

        let mut handles = self.task_handles.lock().await;
        let joins = handles.drain(..);

        for handle in joins {
            match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%err, "worker loop task panicked during shutdown"),
                Err(_) => warn!("worker loop task did not exit within the shutdown grace period"),
            }
        }

        info!("worker client shut down");
        Ok(())
    }

    /// Point-in-time snapshot of poll/submit counters, for a dashboard or a
    /// periodic status line. Nothing in the core reads this by default.
    #[must_use]
    pub fn stats(&self) -> SdkStatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    #[must_use]
    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }
}
