//! HTTP implementation of the `EngineClient` port, built on `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::domain::{WorkItem, WorkResponse};
use crate::ports::engine_client::{EngineClient, EngineError, HandlerDescriptor, PollRequest};

use super::auth::{bearer_token, resolve_host_name};

/// Production implementation of `EngineClient` over HTTP.
///
/// Holds a pooled `reqwest::Client` (connection reuse across poll/submit
/// cycles), the composed server URL, and the precomputed `Authorization`
/// header value.
pub struct ReqwestEngineClient {
    http_client: ReqwestClient,
    server_url: String,
    authorization: String,
}

impl ReqwestEngineClient {
    /// Build a client against `server_url`, authenticating as `client_id`
    /// with `auth_token`. `connection_timeout` bounds each individual
    /// request, not the whole poll/submit lifecycle.
    pub fn new(
        server_url: String,
        client_id: &str,
        auth_token: &str,
        connection_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let http_client = ReqwestClient::builder()
            .timeout(connection_timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            server_url,
            authorization: bearer_token(client_id, auth_token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.server_url)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
        extra_headers: &[(&str, &str)],
    ) -> Result<String, EngineError> {
        let mut request = self
            .http_client
            .request(method, self.url(path))
            .header("Authorization", &self.authorization)
            .json(body);

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::new());

        if !status.is_success() {
            return Err(EngineError::Response {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl EngineClient for ReqwestEngineClient {
    #[instrument(skip(self, handlers))]
    async fn register(&self, handlers: &[HandlerDescriptor]) -> Result<(), EngineError> {
        let body: Vec<_> = handlers
            .iter()
            .map(|h| {
                json!({
                    "processId": 0,
                    "namespace": h.namespace,
                    "stepType": "WORKER",
                    "name": h.name,
                })
            })
            .collect();

        self.send_json(reqwest::Method::PUT, "api/clients/register", &body, &[])
            .await?;
        Ok(())
    }

    #[instrument(skip(self, requests))]
    async fn poll(&self, requests: &[PollRequest]) -> Result<Vec<WorkItem>, EngineError> {
        let host_name = resolve_host_name();
        let body: Vec<_> = requests
            .iter()
            .map(|r| {
                json!({
                    "stepQueueNameData": {
                        "orgId": 1,
                        "namespace": r.namespace,
                        "stepType": "WORKER",
                        "name": r.name,
                    },
                    "size": r.size,
                })
            })
            .collect();

        let response_body = self
            .send_json(
                reqwest::Method::POST,
                "api/clients/poll",
                &body,
                &[("UNMESHED_HOST_NAME", host_name.as_str())],
            )
            .await?;

        serde_json::from_str(&response_body).map_err(|e| EngineError::Decode(e.to_string()))
    }

    #[instrument(skip(self, responses))]
    async fn submit_bulk_results(&self, responses: &[WorkResponse]) -> Result<(), EngineError> {
        self.send_json(
            reqwest::Method::POST,
            "api/clients/bulkResults",
            responses,
            &[],
        )
        .await?;
        Ok(())
    }
}
