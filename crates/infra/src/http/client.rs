//! HTTP client with per-call retry of transient failures
//!
//! Only connect errors, timeouts and 5xx responses are retried here, inside a
//! single logical call. Everything else is returned to the caller, whose own
//! retry policy (page-level for scheduled sync, none for manual sync)
//! decides what happens next.

use std::time::Duration;

use erpsync_common::resilience::{BackoffStrategy, RetryDecision, RetryPolicy};
use erpsync_domain::SyncError;
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Outcome of one attempt, before the retry decision.
enum Attempt {
    Done(Response),
    RetryableStatus(Response),
    RetryableError(reqwest::Error),
    Failed(reqwest::Error),
}

#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, SyncError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute `builder`, retrying transient failures within the attempt
    /// budget. The last 5xx response is returned as-is once the budget runs
    /// out so the caller can classify it.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, SyncError> {
        let mut retries_done = 0;

        loop {
            let request = rebuild(&builder)?;
            let (method, url) = (request.method().clone(), request.url().clone());

            let attempt = self.attempt(request).await;
            let decision = match &attempt {
                Attempt::RetryableStatus(_) | Attempt::RetryableError(_) => {
                    self.retry.decide(retries_done)
                }
                Attempt::Done(_) | Attempt::Failed(_) => RetryDecision::Stop,
            };

            match (attempt, decision) {
                (Attempt::Done(response) | Attempt::RetryableStatus(response), RetryDecision::Stop) => {
                    return Ok(response);
                }
                (Attempt::RetryableError(err) | Attempt::Failed(err), RetryDecision::Stop) => {
                    warn!(%method, %url, retries = retries_done, error = %err, "HTTP request failed");
                    return Err(SyncError::from(InfraError::from(err)));
                }
                (_, RetryDecision::RetryAfter(delay)) => {
                    retries_done += 1;
                    debug!(%method, %url, retry = retries_done, delay_ms = delay.as_millis() as u64, "retrying HTTP request");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: Request) -> Attempt {
        match self.client.execute(request).await {
            Ok(response) if response.status().is_server_error() => Attempt::RetryableStatus(response),
            Ok(response) => Attempt::Done(response),
            Err(err) if err.is_timeout() || err.is_connect() => Attempt::RetryableError(err),
            Err(err) => Attempt::Failed(err),
        }
    }
}

/// Fresh copy of the request for one attempt; streaming bodies cannot be
/// replayed.
fn rebuild(builder: &RequestBuilder) -> Result<Request, SyncError> {
    let copy = builder.try_clone().ok_or_else(|| {
        SyncError::Internal("request body cannot be replayed for retries".into())
    })?;
    copy.build().map_err(|err| InfraError::from(err).into())
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per call, initial try included.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, SyncError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|err| SyncError::from(InfraError::from(err)))?;

        let retries = u32::try_from(self.max_attempts.max(1) - 1).unwrap_or(u32::MAX);
        let backoff = BackoffStrategy::Exponential {
            initial_delay: self.base_backoff,
            base: 2.0,
            max_delay: self.base_backoff.saturating_mul(64),
        };
        let retry = RetryPolicy::new(retries, backoff)
            .map_err(|err| SyncError::Config(err.to_string()))?;

        Ok(HttpClient { client, retry })
    }
}
