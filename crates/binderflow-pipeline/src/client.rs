//! Inference service client.
//!
//! Each stage is one blocking POST. The `poll-seconds` header lets the service
//! hold the connection open until its job finishes, so there is no polling or
//! retry loop on this side and no timeout on stage calls. Only the readiness
//! check is bounded.

use async_trait::async_trait;
use binderflow_common::settings::ServicesConfig;
use binderflow_common::{BinderError, Result, ServiceEndpoint, Stage};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::request::StageRequest;
use crate::response::{decode, StageResponse};

/// Header carrying the long-poll budget in seconds.
pub const POLL_SECONDS_HEADER: &str = "poll-seconds";

/// Status value reported by a service that accepts work.
pub const READY_STATUS: &str = "ready";

/// Default bound on one readiness GET.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait StageInvoker: Send + Sync {
    /// Performs one call for `request.stage()`. Non-200 responses are errors.
    async fn invoke(&self, request: &StageRequest) -> Result<StageResponse>;
}

pub struct NimClient {
    client: Client,
    api_key: SecretString,
    endpoints: HashMap<Stage, ServiceEndpoint>,
    probe_timeout: Duration,
}

impl NimClient {
    pub fn new(api_key: SecretString, endpoints: HashMap<Stage, ServiceEndpoint>) -> Result<Self> {
        let client = ClientBuilder::new().build()?;
        Ok(Self {
            client,
            api_key,
            endpoints,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Client for every stage described in `[services]`.
    pub fn from_services(services: &ServicesConfig, api_key: SecretString) -> Result<Self> {
        let endpoints = Stage::ALL
            .iter()
            .map(|stage| (*stage, services.endpoint(*stage)))
            .collect();
        Ok(Self::new(api_key, endpoints)?
            .with_probe_timeout(Duration::from_secs(services.probe_timeout_seconds)))
    }

    pub fn endpoint(&self, stage: Stage) -> Result<&ServiceEndpoint> {
        self.endpoints
            .get(&stage)
            .ok_or_else(|| BinderError::Config(format!("no endpoint configured for {}", stage)))
    }

    /// Advisory readiness check for one stage's service.
    pub async fn probe(&self, stage: Stage) -> bool {
        match self.endpoint(stage) {
            Ok(endpoint) => probe(&self.client, endpoint, self.probe_timeout).await,
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }
}

#[async_trait]
impl StageInvoker for NimClient {
    #[instrument(skip(self, request), fields(stage = %request.stage()))]
    async fn invoke(&self, request: &StageRequest) -> Result<StageResponse> {
        let stage = request.stage();
        let endpoint = self.endpoint(stage)?;
        let url = endpoint.url();
        info!(url = %url, poll_seconds = endpoint.poll_seconds, "Invoking {}", stage);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .header(POLL_SECONDS_HEADER, endpoint.poll_seconds.to_string())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(BinderError::Service {
                stage: stage.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(bytes = body.len(), "{} responded", stage);
        decode(stage, &body)
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: Option<String>,
}

/// GETs the endpoint's health path. True only for `{"status": "ready"}`;
/// transport errors, timeouts and unexpected bodies report false.
pub async fn probe(client: &Client, endpoint: &ServiceEndpoint, timeout: Duration) -> bool {
    let url = endpoint.health_url();
    let resp = match client.get(&url).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url = %url, "Readiness probe failed: {}", e);
            return false;
        }
    };

    match resp.json::<HealthBody>().await {
        Ok(HealthBody { status: Some(status) }) => {
            debug!(url = %url, status = %status, "Readiness probe answered");
            status == READY_STATUS
        }
        Ok(HealthBody { status: None }) => {
            warn!(url = %url, "Readiness body has no status field");
            false
        }
        Err(e) => {
            warn!(url = %url, "Readiness body is not JSON: {}", e);
            false
        }
    }
}
