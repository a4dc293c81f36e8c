//! HTTP adapter for the Daimon service

use crate::sink::{RemoteClassifier, RemoteSink, SinkError, SinkResult};
use async_trait::async_trait;
use daimon_core::{
    BatchRequest, BatchResponse, HealthResponse, QuickCheckRequest, QuickCheckResponse,
    HEALTH_PATH, QUICK_CHECK_PATH, SHELL_BATCH_PATH,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
const DEFAULT_QUICK_CHECK_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Stateless transport. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    base_url: String,
    quick_check_timeout: Duration,
    batch_timeout: Duration,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            quick_check_timeout: DEFAULT_QUICK_CHECK_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, quick_check: Duration, batch: Duration) -> Self {
        self.quick_check_timeout = quick_check;
        self.batch_timeout = batch;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> SinkResult<HealthResponse> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.batch_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, timeout: Duration) -> SinkResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (timeout {:?})", url, timeout);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn deliver_batch(&self, batch: &BatchRequest) -> SinkResult<BatchResponse> {
        self.post_json(SHELL_BATCH_PATH, batch, self.batch_timeout).await
    }
}

#[async_trait]
impl RemoteClassifier for HttpSink {
    async fn quick_check(&self, prompt: &str) -> SinkResult<QuickCheckResponse> {
        let request = QuickCheckRequest { prompt: prompt.to_string() };
        let response: QuickCheckResponse = self
            .post_json(QUICK_CHECK_PATH, &request, self.quick_check_timeout)
            .await?;
        if !response.is_well_formed() {
            return Err(SinkError::Malformed(format!("salience out of range: {}", response.salience)));
        }
        Ok(response)
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> SinkResult<R> {
    let status = response.status();
    if !status.is_success() {
        warn!("Daimon service returned {}", status);
        return Err(SinkError::Status(status.as_u16()));
    }
    response.json::<R>().await.map_err(transport_error)
}

fn transport_error(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout
    } else if e.is_decode() {
        SinkError::Malformed(e.to_string())
    } else {
        SinkError::Unavailable(e.to_string())
    }
}
