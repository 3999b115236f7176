//! Page fetching over HTTP with bounded retries.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use marquee_core::{MarqueeError, UpstreamConfig};

use crate::errors::CatalogError;

/// Network seam under the HTML scraper.
///
/// Production uses [`HttpPageFetcher`]; tests substitute canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync + Debug {
    /// Fetches `url` and returns the response body as text.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Timeout` - If the request exceeds the configured timeout
    /// - `CatalogError::ConnectionFailed` - If the host cannot be reached
    /// - `CatalogError::HttpStatus` - If the response status is not 2xx
    /// - `CatalogError::TransportFailed` - If the exchange breaks off or the
    ///   body cannot be read
    /// - `CatalogError::RequestRejected` - If the request cannot be built or
    ///   redirects exceed the limit
    async fn fetch(&self, url: &str) -> Result<String, CatalogError>;
}

/// Production fetcher using reqwest.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    /// Builds a client with the upstream's timeout and user agent.
    ///
    /// # Errors
    ///
    /// - `MarqueeError::Configuration` - If the HTTP client cannot be built
    pub fn new(config: &UpstreamConfig) -> marquee_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| MarqueeError::Configuration {
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    /// Per-request timeout the client was built with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(url, &e))
    }
}

fn classify_request_error(url: &str, e: &reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        CatalogError::ConnectionFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else if e.is_builder() || e.is_redirect() {
        CatalogError::RequestRejected {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        CatalogError::TransportFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Exponential backoff schedule for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Schedule taken from the upstream settings.
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Wraps a fetcher and retries transient failures per a [`RetryPolicy`].
///
/// Only errors for which [`CatalogError::is_transient`] holds are retried;
/// a 404 fails on the first attempt.
#[derive(Debug)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: PageFetcher> RetryingFetcher<F> {
    /// Wraps `inner`, retrying per `policy`.
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, CatalogError> {
        let mut retry = 0;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry);
                    tracing::debug!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        url,
                        e,
                        retry + 1,
                        self.policy.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
